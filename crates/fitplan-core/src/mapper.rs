//! Row mapper: backend row trees to view models.
//!
//! Mapping never fails. Missing nested collections become empty vectors,
//! unparseable timestamps become the Unix epoch (with a warning), and a
//! missing owner embed becomes an empty username.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  plan::{DayEntry, ExerciseEntry, WeightRecord, WorkoutPlan, DEFAULT_GLYPH},
  profile::Profile,
  row::{DayRow, ExerciseRow, PlanRow, ProfileRow, WeightRecordRow},
};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
  match DateTime::parse_from_rfc3339(s) {
    Ok(dt) => dt.with_timezone(&Utc),
    Err(e) => {
      tracing::warn!(value = s, error = %e, "unparseable timestamp; using epoch");
      DateTime::<Utc>::UNIX_EPOCH
    }
  }
}

// ─── Plans ───────────────────────────────────────────────────────────────────

pub fn map_plan(row: PlanRow) -> WorkoutPlan {
  let mut days: Vec<DayEntry> = row
    .workout_days
    .unwrap_or_default()
    .into_iter()
    .map(map_day)
    .collect();
  days.sort_by_key(|d| d.position);

  WorkoutPlan {
    id:             row.id,
    owner_id:       row.owner_id,
    owner_username: row.owner.map(|o| o.username).unwrap_or_default(),
    name:           row.name,
    description:    row.description,
    glyph:          row
      .glyph
      .filter(|g| !g.is_empty())
      .unwrap_or_else(|| DEFAULT_GLYPH.to_owned()),
    is_public:      row.is_public,
    like_count:     u64::try_from(row.like_count).unwrap_or(0),
    created_at:     parse_timestamp(&row.created_at),
    updated_at:     parse_timestamp(&row.updated_at),
    days,
    is_liked:       false,
    is_saved:       false,
  }
}

pub fn map_plans(rows: Vec<PlanRow>) -> Vec<WorkoutPlan> {
  rows.into_iter().map(map_plan).collect()
}

pub fn map_day(row: DayRow) -> DayEntry {
  let mut exercises: Vec<ExerciseEntry> = row
    .exercises
    .unwrap_or_default()
    .into_iter()
    .map(map_exercise)
    .collect();
  exercises.sort_by_key(|e| e.position);

  DayEntry {
    id: row.id,
    weekday: row.weekday,
    division: row.division,
    is_rest_day: row.is_rest_day,
    position: row.position,
    exercises,
  }
}

pub fn map_exercise(row: ExerciseRow) -> ExerciseEntry {
  ExerciseEntry {
    id:             row.id,
    name:           row.name,
    sets:           row.sets,
    reps:           row.reps,
    position:       row.position,
    weight_history: map_weight_history(row.weight_records.unwrap_or_default()),
  }
}

/// Map weight records and order them oldest first. Records with equal
/// timestamps keep the backend's order.
pub fn map_weight_history(rows: Vec<WeightRecordRow>) -> Vec<WeightRecord> {
  let mut history: Vec<WeightRecord> =
    rows.into_iter().map(map_weight_record).collect();
  history.sort_by_key(|r| r.recorded_at);
  history
}

pub fn map_weight_record(row: WeightRecordRow) -> WeightRecord {
  WeightRecord {
    id:          row.id,
    weight:      row.weight,
    notes:       row.notes,
    recorded_at: parse_timestamp(&row.created_at),
  }
}

/// Set the caller-specific `is_liked` / `is_saved` flags.
pub fn annotate(
  plans: &mut [WorkoutPlan],
  liked: &HashSet<Uuid>,
  saved: &HashSet<Uuid>,
) {
  for plan in plans {
    plan.is_liked = liked.contains(&plan.id);
    plan.is_saved = saved.contains(&plan.id);
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

pub fn map_profile(row: ProfileRow) -> Profile {
  Profile {
    id:         row.id,
    username:   row.username,
    name:       row.name,
    email:      row.email,
    created_at: parse_timestamp(&row.created_at),
    updated_at: parse_timestamp(&row.updated_at),
  }
}
