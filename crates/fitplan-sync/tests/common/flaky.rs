//! A backend wrapper that fails chosen calls on demand.

use std::{
  collections::HashSet,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use fitplan_core::{
  auth::{AuthEvent, Credentials, Identity, Session, UserAttributes},
  link::{LinkKind, LinkOutcome},
  row::{
    DayRow, ExerciseRow, LinkRow, NewDayRow, NewExerciseRow, NewPlanRow, NewProfileRow,
    NewWeightRecordRow, PlanPatch, PlanRow, ProfilePatch, ProfileRow, WeightRecordRow,
  },
  store::{Backend, BackendError, ErrorKind, PlanQuery},
};
use fitplan_store_sqlite::SqliteBackend;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FlakyError {
  #[error("injected failure in {0}")]
  Injected(&'static str),

  #[error(transparent)]
  Inner(#[from] fitplan_store_sqlite::Error),
}

impl BackendError for FlakyError {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Injected(_) => ErrorKind::Other,
      Self::Inner(e) => e.kind(),
    }
  }
}

/// Which calls fail. Shared with the test so it can arm faults after the
/// client has taken ownership of the backend.
#[derive(Debug, Default)]
pub struct Faults {
  /// Day inserts at these ordering indexes fail.
  pub day_positions:  Mutex<HashSet<u32>>,
  /// Exercise inserts with these names fail.
  pub exercise_names: Mutex<HashSet<String>>,
  pub sign_out:       AtomicBool,
}

impl Faults {
  pub fn fail_day(&self, position: u32) {
    self.day_positions.lock().unwrap().insert(position);
  }

  pub fn fail_exercise(&self, name: &str) {
    self.exercise_names.lock().unwrap().insert(name.to_owned());
  }

  pub fn fail_sign_out(&self) { self.sign_out.store(true, Ordering::SeqCst); }
}

pub struct FlakyBackend {
  inner:  SqliteBackend,
  faults: Arc<Faults>,
}

impl FlakyBackend {
  pub async fn new() -> (Self, Arc<Faults>) {
    let inner = SqliteBackend::open_in_memory()
      .await
      .expect("in-memory backend");
    let faults = Arc::new(Faults::default());
    (Self { inner, faults: Arc::clone(&faults) }, faults)
  }
}

impl Backend for FlakyBackend {
  type Error = FlakyError;

  // ── Auth ──────────────────────────────────────────────────────────────

  async fn sign_up(&self, credentials: Credentials) -> Result<Session, FlakyError> {
    Ok(self.inner.sign_up(credentials).await?)
  }

  async fn sign_in(&self, credentials: Credentials) -> Result<Session, FlakyError> {
    Ok(self.inner.sign_in(credentials).await?)
  }

  async fn sign_out(&self) -> Result<(), FlakyError> {
    if self.faults.sign_out.load(Ordering::SeqCst) {
      return Err(FlakyError::Injected("sign_out"));
    }
    Ok(self.inner.sign_out().await?)
  }

  fn current_session(&self) -> Option<Session> { self.inner.current_session() }

  async fn update_user(&self, attributes: UserAttributes) -> Result<Identity, FlakyError> {
    Ok(self.inner.update_user(attributes).await?)
  }

  async fn reset_password_for_email<'a>(&'a self, email: &'a str) -> Result<(), FlakyError> {
    Ok(self.inner.reset_password_for_email(email).await?)
  }

  fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent> { self.inner.subscribe_auth() }

  // ── Profiles ──────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<ProfileRow>, FlakyError> {
    Ok(self.inner.get_profile(id).await?)
  }

  async fn find_profile_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> Result<Option<ProfileRow>, FlakyError> {
    Ok(self.inner.find_profile_by_username(username).await?)
  }

  async fn insert_profile(&self, row: NewProfileRow) -> Result<ProfileRow, FlakyError> {
    Ok(self.inner.insert_profile(row).await?)
  }

  async fn update_profile(
    &self,
    id: Uuid,
    patch: ProfilePatch,
  ) -> Result<Option<ProfileRow>, FlakyError> {
    Ok(self.inner.update_profile(id, patch).await?)
  }

  // ── Plans ─────────────────────────────────────────────────────────────

  async fn select_plans(&self, query: PlanQuery) -> Result<Vec<PlanRow>, FlakyError> {
    Ok(self.inner.select_plans(query).await?)
  }

  async fn insert_plan(&self, row: NewPlanRow) -> Result<PlanRow, FlakyError> {
    Ok(self.inner.insert_plan(row).await?)
  }

  async fn insert_day(&self, row: NewDayRow) -> Result<DayRow, FlakyError> {
    let fail = self.faults.day_positions.lock().unwrap().contains(&row.position);
    if fail {
      return Err(FlakyError::Injected("insert_day"));
    }
    Ok(self.inner.insert_day(row).await?)
  }

  async fn insert_exercise(&self, row: NewExerciseRow) -> Result<ExerciseRow, FlakyError> {
    let fail = self.faults.exercise_names.lock().unwrap().contains(&row.name);
    if fail {
      return Err(FlakyError::Injected("insert_exercise"));
    }
    Ok(self.inner.insert_exercise(row).await?)
  }

  async fn update_plan(
    &self,
    id: Uuid,
    owner_id: Uuid,
    patch: PlanPatch,
  ) -> Result<Option<PlanRow>, FlakyError> {
    Ok(self.inner.update_plan(id, owner_id, patch).await?)
  }

  async fn delete_plan(&self, id: Uuid, owner_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_plan(id, owner_id).await?)
  }

  async fn delete_days(&self, plan_id: Uuid, owner_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_days(plan_id, owner_id).await?)
  }

  // ── Weight records ────────────────────────────────────────────────────

  async fn insert_weight_record(
    &self,
    row: NewWeightRecordRow,
  ) -> Result<WeightRecordRow, FlakyError> {
    Ok(self.inner.insert_weight_record(row).await?)
  }

  async fn select_weight_records(
    &self,
    exercise_id: Uuid,
    profile_id: Uuid,
  ) -> Result<Vec<WeightRecordRow>, FlakyError> {
    Ok(self.inner.select_weight_records(exercise_id, profile_id).await?)
  }

  // ── Links ─────────────────────────────────────────────────────────────

  async fn insert_link(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
    plan_id: Uuid,
  ) -> Result<LinkOutcome, FlakyError> {
    Ok(self.inner.insert_link(kind, profile_id, plan_id).await?)
  }

  async fn delete_link(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
    plan_id: Uuid,
  ) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_link(kind, profile_id, plan_id).await?)
  }

  async fn select_links(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
  ) -> Result<Vec<LinkRow>, FlakyError> {
    Ok(self.inner.select_links(kind, profile_id).await?)
  }
}
