//! Row shapes exchanged with the backend.
//!
//! These mirror what the backend's query client returns: flat columns with
//! timestamps serialised as RFC 3339 strings, and nested collections embedded
//! as optional arrays. A missing embed deserialises to `None`; the
//! [`mapper`](crate::mapper) treats that as an empty collection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
  pub id:         Uuid,
  pub username:   String,
  pub name:       String,
  pub email:      String,
  pub created_at: String,
  pub updated_at: String,
}

/// Insert payload for the `profiles` table. The id is the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfileRow {
  pub id:       Uuid,
  pub username: String,
  pub name:     String,
  pub email:    String,
}

/// Partial update of a profile; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
  pub username: Option<String>,
  pub name:     Option<String>,
  pub email:    Option<String>,
}

impl ProfilePatch {
  pub fn is_empty(&self) -> bool {
    self.username.is_none() && self.name.is_none() && self.email.is_none()
  }
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// The `profiles(username)` embed attached to a plan row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRow {
  pub username: String,
}

/// A `workouts` row with its day/exercise/weight-record tree embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
  pub id:           Uuid,
  pub owner_id:     Uuid,
  pub name:         String,
  pub description:  Option<String>,
  pub glyph:        Option<String>,
  pub is_public:    bool,
  /// Denormalised; maintained by the backend alongside like links.
  pub like_count:   i64,
  pub created_at:   String,
  pub updated_at:   String,
  #[serde(default)]
  pub owner:        Option<OwnerRow>,
  #[serde(default)]
  pub workout_days: Option<Vec<DayRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRow {
  pub id:          Uuid,
  pub workout_id:  Uuid,
  pub weekday:     String,
  pub division:    String,
  pub is_rest_day: bool,
  pub position:    u32,
  #[serde(default)]
  pub exercises:   Option<Vec<ExerciseRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRow {
  pub id:             Uuid,
  pub day_id:         Uuid,
  pub name:           String,
  pub sets:           u32,
  pub reps:           String,
  pub position:       u32,
  #[serde(default)]
  pub weight_records: Option<Vec<WeightRecordRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecordRow {
  pub id:          Uuid,
  pub exercise_id: Uuid,
  pub profile_id:  Uuid,
  pub weight:      f64,
  pub notes:       Option<String>,
  pub created_at:  String,
}

// ─── Insert / update payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanRow {
  pub owner_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub glyph:       String,
  pub is_public:   bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDayRow {
  pub workout_id:  Uuid,
  pub weekday:     String,
  pub division:    String,
  pub is_rest_day: bool,
  pub position:    u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExerciseRow {
  pub day_id:   Uuid,
  pub name:     String,
  pub sets:     u32,
  pub reps:     String,
  pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWeightRecordRow {
  pub exercise_id: Uuid,
  pub profile_id:  Uuid,
  pub weight:      f64,
  pub notes:       Option<String>,
}

/// Partial update of a plan's top-level fields.
///
/// `description` is doubly optional: `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPatch {
  pub name:        Option<String>,
  pub description: Option<Option<String>>,
  pub glyph:       Option<String>,
  pub is_public:   Option<bool>,
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRow {
  pub profile_id: Uuid,
  pub workout_id: Uuid,
  pub created_at: String,
}
