//! Encoding and decoding helpers between backend row types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order.
//! UUIDs are stored as hyphenated lowercase strings. Booleans are integers.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use fitplan_core::row::{
  DayRow, ExerciseRow, LinkRow, OwnerRow, PlanRow, ProfileRow, WeightRecordRow,
};
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

pub fn now() -> String { encode_dt(Utc::now()) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id: String,
  pub username:   String,
  pub name:       String,
  pub email:      String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawProfile {
  pub const COLUMNS: &'static str =
    "profile_id, username, name, email, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id: row.get(0)?,
      username:   row.get(1)?,
      name:       row.get(2)?,
      email:      row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_row(self) -> Result<ProfileRow> {
    Ok(ProfileRow {
      id:         decode_uuid(&self.profile_id)?,
      username:   self.username,
      name:       self.name,
      email:      self.email,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// A `workouts` row joined with the owner's username.
pub struct RawPlan {
  pub workout_id:  String,
  pub owner_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub glyph:       String,
  pub is_public:   bool,
  pub like_count:  i64,
  pub created_at:  String,
  pub updated_at:  String,
  pub username:    Option<String>,
}

impl RawPlan {
  /// Column list for a `workouts w LEFT JOIN profiles p` select.
  pub const COLUMNS: &'static str = "w.workout_id, w.owner_id, w.name, \
     w.description, w.glyph, w.is_public, w.like_count, w.created_at, \
     w.updated_at, p.username";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      workout_id:  row.get(0)?,
      owner_id:    row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      glyph:       row.get(4)?,
      is_public:   row.get(5)?,
      like_count:  row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
      username:    row.get(9)?,
    })
  }

  /// Decode without an embedded day tree.
  pub fn into_row(self) -> Result<PlanRow> {
    Ok(PlanRow {
      id:           decode_uuid(&self.workout_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      name:         self.name,
      description:  self.description,
      glyph:        Some(self.glyph),
      is_public:    self.is_public,
      like_count:   self.like_count,
      created_at:   self.created_at,
      updated_at:   self.updated_at,
      owner:        self.username.map(|username| OwnerRow { username }),
      workout_days: None,
    })
  }
}

pub struct RawDay {
  pub day_id:      String,
  pub workout_id:  String,
  pub weekday:     String,
  pub division:    String,
  pub is_rest_day: bool,
  pub position:    u32,
}

impl RawDay {
  pub const COLUMNS: &'static str =
    "day_id, workout_id, weekday, division, is_rest_day, position";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      day_id:      row.get(0)?,
      workout_id:  row.get(1)?,
      weekday:     row.get(2)?,
      division:    row.get(3)?,
      is_rest_day: row.get(4)?,
      position:    row.get(5)?,
    })
  }

  pub fn into_row(self) -> Result<DayRow> {
    Ok(DayRow {
      id:          decode_uuid(&self.day_id)?,
      workout_id:  decode_uuid(&self.workout_id)?,
      weekday:     self.weekday,
      division:    self.division,
      is_rest_day: self.is_rest_day,
      position:    self.position,
      exercises:   None,
    })
  }
}

pub struct RawExercise {
  pub exercise_id: String,
  pub day_id:      String,
  pub name:        String,
  pub sets:        u32,
  pub reps:        String,
  pub position:    u32,
}

impl RawExercise {
  pub const COLUMNS: &'static str =
    "exercise_id, day_id, name, sets, reps, position";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      exercise_id: row.get(0)?,
      day_id:      row.get(1)?,
      name:        row.get(2)?,
      sets:        row.get(3)?,
      reps:        row.get(4)?,
      position:    row.get(5)?,
    })
  }

  pub fn into_row(self) -> Result<ExerciseRow> {
    Ok(ExerciseRow {
      id:             decode_uuid(&self.exercise_id)?,
      day_id:         decode_uuid(&self.day_id)?,
      name:           self.name,
      sets:           self.sets,
      reps:           self.reps,
      position:       self.position,
      weight_records: None,
    })
  }
}

pub struct RawWeightRecord {
  pub record_id:   String,
  pub exercise_id: String,
  pub profile_id:  String,
  pub weight:      f64,
  pub notes:       Option<String>,
  pub created_at:  String,
}

impl RawWeightRecord {
  pub const COLUMNS: &'static str =
    "record_id, exercise_id, profile_id, weight, notes, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      exercise_id: row.get(1)?,
      profile_id:  row.get(2)?,
      weight:      row.get(3)?,
      notes:       row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_row(self) -> Result<WeightRecordRow> {
    Ok(WeightRecordRow {
      id:          decode_uuid(&self.record_id)?,
      exercise_id: decode_uuid(&self.exercise_id)?,
      profile_id:  decode_uuid(&self.profile_id)?,
      weight:      self.weight,
      notes:       self.notes,
      created_at:  self.created_at,
    })
  }
}

pub struct RawLink {
  pub profile_id: String,
  pub workout_id: String,
  pub created_at: String,
}

impl RawLink {
  pub fn into_row(self) -> Result<LinkRow> {
    Ok(LinkRow {
      profile_id: decode_uuid(&self.profile_id)?,
      workout_id: decode_uuid(&self.workout_id)?,
      created_at: self.created_at,
    })
  }
}

// ─── Tree assembly ───────────────────────────────────────────────────────────

/// Everything read for one `select_plans` call, before decoding.
#[derive(Default)]
pub struct RawTree {
  pub plans:     Vec<RawPlan>,
  pub days:      Vec<RawDay>,
  pub exercises: Vec<RawExercise>,
  pub records:   Vec<RawWeightRecord>,
}

impl RawTree {
  /// Decode all rows and nest records under exercises, exercises under days,
  /// and days under plans. Plan order is preserved; child order is whatever
  /// the database returned.
  pub fn assemble(self) -> Result<Vec<PlanRow>> {
    let mut records_by_exercise: HashMap<Uuid, Vec<WeightRecordRow>> = HashMap::new();
    for raw in self.records {
      let record = raw.into_row()?;
      records_by_exercise.entry(record.exercise_id).or_default().push(record);
    }

    let mut exercises_by_day: HashMap<Uuid, Vec<ExerciseRow>> = HashMap::new();
    for raw in self.exercises {
      let mut exercise = raw.into_row()?;
      exercise.weight_records =
        Some(records_by_exercise.remove(&exercise.id).unwrap_or_default());
      exercises_by_day.entry(exercise.day_id).or_default().push(exercise);
    }

    let mut days_by_plan: HashMap<Uuid, Vec<DayRow>> = HashMap::new();
    for raw in self.days {
      let mut day = raw.into_row()?;
      day.exercises = Some(exercises_by_day.remove(&day.id).unwrap_or_default());
      days_by_plan.entry(day.workout_id).or_default().push(day);
    }

    self
      .plans
      .into_iter()
      .map(|raw| {
        let mut plan = raw.into_row()?;
        plan.workout_days = Some(days_by_plan.remove(&plan.id).unwrap_or_default());
        Ok(plan)
      })
      .collect()
  }
}
