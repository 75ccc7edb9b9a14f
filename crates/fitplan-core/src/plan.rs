//! Workout plan view models and creation inputs.
//!
//! View models are what the collection store holds and consumers read: ids
//! and timestamps are typed, children are ordered by their ordering index,
//! and the owner's username is flattened onto the plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Glyph assigned to plans created without one.
pub const DEFAULT_GLYPH: &str = "💪";

// ─── View models ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
  pub id:             Uuid,
  pub owner_id:       Uuid,
  /// Denormalised from the owner's profile for display.
  pub owner_username: String,
  pub name:           String,
  pub description:    Option<String>,
  pub glyph:          String,
  pub is_public:      bool,
  pub like_count:     u64,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  /// Sorted by [`DayEntry::position`].
  pub days:           Vec<DayEntry>,
  /// Whether the current caller has liked this plan.
  pub is_liked:       bool,
  /// Whether the current caller has saved this plan.
  pub is_saved:       bool,
}

impl WorkoutPlan {
  /// Find an exercise anywhere in this plan's day tree.
  pub fn exercise(&self, exercise_id: Uuid) -> Option<&ExerciseEntry> {
    self
      .days
      .iter()
      .flat_map(|d| d.exercises.iter())
      .find(|e| e.id == exercise_id)
  }

  /// Number of days that are not rest days.
  pub fn training_days(&self) -> usize {
    self.days.iter().filter(|d| !d.is_rest_day).count()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
  pub id:          Uuid,
  pub weekday:     String,
  pub division:    String,
  pub is_rest_day: bool,
  pub position:    u32,
  /// Sorted by [`ExerciseEntry::position`].
  pub exercises:   Vec<ExerciseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
  pub id:             Uuid,
  pub name:           String,
  pub sets:           u32,
  /// Free-text rep target, e.g. `"8-12"`.
  pub reps:           String,
  pub position:       u32,
  /// Oldest first; reverse for most-recent-first display.
  pub weight_history: Vec<WeightRecord>,
}

impl ExerciseEntry {
  pub fn latest_weight(&self) -> Option<f64> {
    self.weight_history.last().map(|r| r.weight)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
  pub id:          Uuid,
  pub weight:      f64,
  pub notes:       Option<String>,
  pub recorded_at: DateTime<Utc>,
}

// ─── Creation inputs ─────────────────────────────────────────────────────────

/// A complete plan tree submitted for creation.
///
/// Deserialisable so plan definitions can be loaded from files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlan {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub glyph:       Option<String>,
  #[serde(default)]
  pub is_public:   bool,
  #[serde(default)]
  pub days:        Vec<NewDay>,
}

impl NewPlan {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      description: None,
      glyph:       None,
      is_public:   false,
      days:        Vec::new(),
    }
  }

  pub fn with_day(mut self, day: NewDay) -> Self {
    self.days.push(day);
    self
  }
}

/// Pair each day with the ordering index it will be stored with: its
/// explicit `position`, or its index in `days` when unset.
pub fn positioned(days: &[NewDay]) -> impl Iterator<Item = (u32, &NewDay)> {
  days
    .iter()
    .enumerate()
    .map(|(i, d)| (d.position.unwrap_or(i as u32), d))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDay {
  pub weekday:     String,
  #[serde(default)]
  pub division:    String,
  #[serde(default)]
  pub is_rest_day: bool,
  /// Explicit ordering index; defaults to the day's index in the plan.
  #[serde(default)]
  pub position:    Option<u32>,
  #[serde(default)]
  pub exercises:   Vec<NewExercise>,
}

impl NewDay {
  pub fn rest(weekday: impl Into<String>) -> Self {
    Self {
      weekday:     weekday.into(),
      division:    String::new(),
      is_rest_day: true,
      position:    None,
      exercises:   Vec::new(),
    }
  }

  pub fn training(weekday: impl Into<String>, division: impl Into<String>) -> Self {
    Self {
      weekday:     weekday.into(),
      division:    division.into(),
      is_rest_day: false,
      position:    None,
      exercises:   Vec::new(),
    }
  }

  pub fn with_exercise(mut self, exercise: NewExercise) -> Self {
    self.exercises.push(exercise);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExercise {
  pub name: String,
  #[serde(default = "default_sets")]
  pub sets: u32,
  #[serde(default = "default_reps")]
  pub reps: String,
}

impl NewExercise {
  pub fn new(name: impl Into<String>, sets: u32, reps: impl Into<String>) -> Self {
    Self { name: name.into(), sets, reps: reps.into() }
  }
}

fn default_sets() -> u32 { 3 }

fn default_reps() -> String { "8-12".to_owned() }
