//! SQL schema for the fitplan SQLite backend.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Auth ────────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS password_resets (
    reset_id     TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    requested_at TEXT NOT NULL
);

-- Client-side key/value storage (persisted session token).
CREATE TABLE IF NOT EXISTS client_kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- ── Data ────────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS profiles (
    profile_id TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    username   TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workouts (
    workout_id  TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    glyph       TEXT NOT NULL,
    is_public   INTEGER NOT NULL DEFAULT 0,
    like_count  INTEGER NOT NULL DEFAULT 0,   -- kept in step with workout_likes
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workout_days (
    day_id      TEXT PRIMARY KEY,
    workout_id  TEXT NOT NULL REFERENCES workouts(workout_id) ON DELETE CASCADE,
    weekday     TEXT NOT NULL,
    division    TEXT NOT NULL DEFAULT '',
    is_rest_day INTEGER NOT NULL DEFAULT 0,
    position    INTEGER NOT NULL,
    UNIQUE (workout_id, position)
);

CREATE TABLE IF NOT EXISTS exercises (
    exercise_id TEXT PRIMARY KEY,
    day_id      TEXT NOT NULL REFERENCES workout_days(day_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    sets        INTEGER NOT NULL,
    reps        TEXT NOT NULL,
    position    INTEGER NOT NULL,
    UNIQUE (day_id, position)
);

-- Weight records are append-only.
-- No UPDATE or DELETE is ever issued against this table directly.
CREATE TABLE IF NOT EXISTS weight_records (
    record_id   TEXT PRIMARY KEY,
    exercise_id TEXT NOT NULL REFERENCES exercises(exercise_id) ON DELETE CASCADE,
    profile_id  TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    weight      REAL NOT NULL,
    notes       TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS saved_workouts (
    profile_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    workout_id TEXT NOT NULL REFERENCES workouts(workout_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (profile_id, workout_id)
);

CREATE TABLE IF NOT EXISTS workout_likes (
    profile_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    workout_id TEXT NOT NULL REFERENCES workouts(workout_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (profile_id, workout_id)
);

CREATE INDEX IF NOT EXISTS workouts_owner_idx     ON workouts(owner_id);
CREATE INDEX IF NOT EXISTS workouts_public_idx    ON workouts(is_public, like_count);
CREATE INDEX IF NOT EXISTS days_workout_idx       ON workout_days(workout_id);
CREATE INDEX IF NOT EXISTS exercises_day_idx      ON exercises(day_id);
CREATE INDEX IF NOT EXISTS weight_exercise_idx    ON weight_records(exercise_id, profile_id);

PRAGMA user_version = 1;
";
