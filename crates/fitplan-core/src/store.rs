//! The [`Backend`] trait and supporting query types.
//!
//! The trait models a hosted backend-as-a-service: an auth API with a
//! session-change stream, and a relational query client with owner filters.
//! It is implemented by storage backends (e.g. `fitplan-store-sqlite`); the
//! client layer (`fitplan-sync`) depends on this abstraction only.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  auth::{AuthEvent, Credentials, Identity, Session, UserAttributes},
  link::{LinkKind, LinkOutcome},
  row::{
    DayRow, ExerciseRow, LinkRow, NewDayRow, NewExerciseRow, NewPlanRow,
    NewProfileRow, NewWeightRecordRow, PlanPatch, PlanRow, ProfilePatch,
    ProfileRow, WeightRecordRow,
  },
};

// ─── Error classification ────────────────────────────────────────────────────

/// Coarse category of a backend failure, used by the session layer to pick a
/// user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidCredentials,
  EmailTaken,
  UsernameTaken,
  NotFound,
  Duplicate,
  Unauthenticated,
  Other,
}

pub trait BackendError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Sort order for [`Backend::select_plans`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanOrder {
  /// `created_at` descending.
  #[default]
  Newest,
  /// `like_count` descending, then `created_at` descending.
  MostLiked,
}

/// Parameters for [`Backend::select_plans`].
///
/// Row-level visibility always applies: a viewer sees their own plans and
/// public plans; an anonymous query sees public plans only. Embedded weight
/// records are restricted to the viewer's own records.
#[derive(Debug, Clone, Default)]
pub struct PlanQuery {
  pub viewer:      Option<Uuid>,
  /// Equality filter on `owner_id`.
  pub owner:       Option<Uuid>,
  pub public_only: bool,
  /// Restrict to these plan ids.
  pub ids:         Option<Vec<Uuid>>,
  pub order:       PlanOrder,
}

impl PlanQuery {
  pub fn owned_by(viewer: Uuid) -> Self {
    Self { viewer: Some(viewer), owner: Some(viewer), ..Self::default() }
  }

  pub fn public(viewer: Option<Uuid>) -> Self {
    Self {
      viewer,
      public_only: true,
      order: PlanOrder::MostLiked,
      ..Self::default()
    }
  }

  pub fn by_ids(viewer: Uuid, ids: Vec<Uuid>) -> Self {
    Self { viewer: Some(viewer), ids: Some(ids), ..Self::default() }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the hosted backend.
///
/// Every data method performs one round trip. Writes on plans are scoped by an
/// explicit owner filter and report "not owner" as `None`/`false` rather than
/// an error. Weight records are append-only: there is no update or delete.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks.
pub trait Backend: Send + Sync {
  type Error: BackendError;

  // ── Auth ──────────────────────────────────────────────────────────────

  /// Create an auth user and sign it in.
  fn sign_up(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  fn sign_in(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Invalidate the current session. Emits [`AuthEvent::SignedOut`].
  fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The session this client currently holds, if any.
  fn current_session(&self) -> Option<Session>;

  /// Update the signed-in auth user's email and/or password.
  fn update_user(
    &self,
    attributes: UserAttributes,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Request a password-reset email. Succeeds for unknown addresses too.
  fn reset_password_for_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Subscribe to session-change notifications.
  fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent>;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ProfileRow>, Self::Error>> + Send + '_;

  fn find_profile_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<ProfileRow>, Self::Error>> + Send + 'a;

  /// Fails with [`ErrorKind::UsernameTaken`] if the handle is in use.
  fn insert_profile(
    &self,
    row: NewProfileRow,
  ) -> impl Future<Output = Result<ProfileRow, Self::Error>> + Send + '_;

  /// Returns `None` if no profile has this id.
  fn update_profile(
    &self,
    id: Uuid,
    patch: ProfilePatch,
  ) -> impl Future<Output = Result<Option<ProfileRow>, Self::Error>> + Send + '_;

  // ── Plans ─────────────────────────────────────────────────────────────

  /// Select plans with their full day/exercise/weight-record tree embedded.
  fn select_plans(
    &self,
    query: PlanQuery,
  ) -> impl Future<Output = Result<Vec<PlanRow>, Self::Error>> + Send + '_;

  fn insert_plan(
    &self,
    row: NewPlanRow,
  ) -> impl Future<Output = Result<PlanRow, Self::Error>> + Send + '_;

  fn insert_day(
    &self,
    row: NewDayRow,
  ) -> impl Future<Output = Result<DayRow, Self::Error>> + Send + '_;

  fn insert_exercise(
    &self,
    row: NewExerciseRow,
  ) -> impl Future<Output = Result<ExerciseRow, Self::Error>> + Send + '_;

  /// Update top-level plan fields where `id` and `owner_id` both match.
  /// Returns `None` when no row matched.
  fn update_plan(
    &self,
    id: Uuid,
    owner_id: Uuid,
    patch: PlanPatch,
  ) -> impl Future<Output = Result<Option<PlanRow>, Self::Error>> + Send + '_;

  /// Delete a plan where `id` and `owner_id` both match; children and links
  /// cascade. Returns `false` when no row matched.
  fn delete_plan(
    &self,
    id: Uuid,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every day (and, by cascade, exercise) of an owned plan.
  /// Returns `false` when the plan is not owned by `owner_id`.
  fn delete_days(
    &self,
    plan_id: Uuid,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Weight records (append-only) ──────────────────────────────────────

  fn insert_weight_record(
    &self,
    row: NewWeightRecordRow,
  ) -> impl Future<Output = Result<WeightRecordRow, Self::Error>> + Send + '_;

  /// A profile's records for one exercise, oldest first.
  fn select_weight_records(
    &self,
    exercise_id: Uuid,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Vec<WeightRecordRow>, Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Insert a link. A repeated insert returns [`LinkOutcome::AlreadyExists`]
  /// and leaves exactly one row. Inserting a like also increments the plan's
  /// like counter in the same backend transaction.
  fn insert_link(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
    plan_id: Uuid,
  ) -> impl Future<Output = Result<LinkOutcome, Self::Error>> + Send + '_;

  /// Delete a link; returns `false` if none existed.
  fn delete_link(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
    plan_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// A profile's links of one kind, most recent first.
  fn select_links(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Vec<LinkRow>, Self::Error>> + Send + '_;
}
