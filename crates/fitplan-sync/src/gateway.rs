//! The CRUD gateway: one method per entity action, each scoped to the
//! signed-in identity.
//!
//! Every operation comes in two forms. `try_*` methods return a
//! [`GatewayError`] so callers can tell "failed" from "empty". The plain
//! methods degrade instead: failures are logged and surface as an empty list,
//! `None`, or `false`, and nothing is retried.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use fitplan_core::{
  Backend, ValidationError,
  auth::Identity,
  link::{LinkKind, LinkOutcome},
  mapper,
  plan::{DEFAULT_GLYPH, NewDay, NewPlan, WeightRecord, WorkoutPlan, positioned},
  profile::{Profile, ProfileStats, default_display_name, username_base},
  row::{
    NewDayRow, NewExerciseRow, NewPlanRow, NewProfileRow, NewWeightRecordRow,
    PlanPatch, ProfilePatch,
  },
  store::{BackendError, ErrorKind, PlanOrder, PlanQuery},
  validate,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::session::SessionState;

/// Suffixes tried by [`Gateway::generate_unique_username`] before giving up
/// on sequential candidates.
const MAX_USERNAME_SUFFIX: u32 = 999;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("not signed in")]
  NotAuthenticated,

  #[error(transparent)]
  Core(#[from] fitplan_core::Error),

  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("backend error: {source}")]
  Backend {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl GatewayError {
  pub fn backend<E: BackendError>(err: E) -> Self {
    Self::Backend { kind: err.kind(), source: Box::new(err) }
  }

  /// The backend's classification, for errors that came from the backend.
  pub fn backend_kind(&self) -> Option<ErrorKind> {
    match self {
      Self::Backend { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}

impl From<ValidationError> for GatewayError {
  fn from(err: ValidationError) -> Self { Self::Core(err.into()) }
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Collapse a failed call into `T::default()`, logging the failure.
fn or_log<T: Default>(op: &'static str, result: Result<T>) -> T {
  match result {
    Ok(value) => value,
    Err(GatewayError::NotAuthenticated) => {
      debug!(op, "skipped: not signed in");
      T::default()
    }
    Err(err) => {
      error!(op, error = %err, "gateway call failed");
      T::default()
    }
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// Async CRUD operations over a [`Backend`], scoped to the identity published
/// by the session provider.
pub struct Gateway<B> {
  backend: Arc<B>,
  session: watch::Receiver<SessionState>,
}

impl<B> Clone for Gateway<B> {
  fn clone(&self) -> Self {
    Self { backend: Arc::clone(&self.backend), session: self.session.clone() }
  }
}

impl<B: Backend> Gateway<B> {
  pub fn new(backend: Arc<B>, session: watch::Receiver<SessionState>) -> Self {
    Self { backend, session }
  }

  /// The identity operations are currently scoped to.
  pub fn identity(&self) -> Option<Identity> { self.session.borrow().identity.clone() }

  fn require_identity(&self) -> Result<Identity> {
    self.identity().ok_or(GatewayError::NotAuthenticated)
  }

  fn viewer(&self) -> Option<Uuid> { self.identity().map(|i| i.user_id) }

  // ── Plan reads ────────────────────────────────────────────────────────

  async fn select(&self, query: PlanQuery) -> Result<Vec<WorkoutPlan>> {
    let viewer = query.viewer;
    let rows = self
      .backend
      .select_plans(query)
      .await
      .map_err(GatewayError::backend)?;
    let mut plans = mapper::map_plans(rows);
    if let Some(viewer) = viewer {
      self.annotate(viewer, &mut plans).await?;
    }
    Ok(plans)
  }

  async fn link_set(&self, kind: LinkKind, profile_id: Uuid) -> Result<HashSet<Uuid>> {
    let links = self
      .backend
      .select_links(kind, profile_id)
      .await
      .map_err(GatewayError::backend)?;
    Ok(links.into_iter().map(|l| l.workout_id).collect())
  }

  async fn annotate(&self, viewer: Uuid, plans: &mut [WorkoutPlan]) -> Result<()> {
    if plans.is_empty() {
      return Ok(());
    }
    let liked = self.link_set(LinkKind::Liked, viewer).await?;
    let saved = self.link_set(LinkKind::Saved, viewer).await?;
    mapper::annotate(plans, &liked, &saved);
    Ok(())
  }

  /// The caller's plans, newest first.
  pub async fn try_fetch_own_plans(&self) -> Result<Vec<WorkoutPlan>> {
    let identity = self.require_identity()?;
    self.select(PlanQuery::owned_by(identity.user_id)).await
  }

  pub async fn fetch_own_plans(&self) -> Vec<WorkoutPlan> {
    or_log("fetch_own_plans", self.try_fetch_own_plans().await)
  }

  /// Every public plan, most liked first, then newest. Works signed out.
  pub async fn try_fetch_public_plans(&self) -> Result<Vec<WorkoutPlan>> {
    self.select(PlanQuery::public(self.viewer())).await
  }

  pub async fn fetch_public_plans(&self) -> Vec<WorkoutPlan> {
    or_log("fetch_public_plans", self.try_fetch_public_plans().await)
  }

  /// Plans the caller saved, most recently saved first. Saved plans that are
  /// no longer visible to the caller are omitted.
  pub async fn try_fetch_saved_plans(&self) -> Result<Vec<WorkoutPlan>> {
    let identity = self.require_identity()?;
    let links = self
      .backend
      .select_links(LinkKind::Saved, identity.user_id)
      .await
      .map_err(GatewayError::backend)?;
    let ids: Vec<Uuid> = links.iter().map(|l| l.workout_id).collect();

    let mut by_id: HashMap<Uuid, WorkoutPlan> = self
      .select(PlanQuery::by_ids(identity.user_id, ids.clone()))
      .await?
      .into_iter()
      .map(|p| (p.id, p))
      .collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
  }

  pub async fn fetch_saved_plans(&self) -> Vec<WorkoutPlan> {
    or_log("fetch_saved_plans", self.try_fetch_saved_plans().await)
  }

  /// One plan, if it exists and is visible to the caller.
  pub async fn try_fetch_plan(&self, plan_id: Uuid) -> Result<Option<WorkoutPlan>> {
    let query = PlanQuery {
      viewer: self.viewer(),
      ids: Some(vec![plan_id]),
      ..PlanQuery::default()
    };
    Ok(self.select(query).await?.into_iter().next())
  }

  pub async fn fetch_plan(&self, plan_id: Uuid) -> Option<WorkoutPlan> {
    or_log("fetch_plan", self.try_fetch_plan(plan_id).await)
  }

  /// Another user's public plans, newest first. Unknown usernames yield an
  /// empty list.
  pub async fn try_fetch_public_plans_by(&self, username: &str) -> Result<Vec<WorkoutPlan>> {
    let Some(profile) = self
      .backend
      .find_profile_by_username(username)
      .await
      .map_err(GatewayError::backend)?
    else {
      return Ok(Vec::new());
    };
    self
      .select(PlanQuery {
        viewer:      self.viewer(),
        owner:       Some(profile.id),
        public_only: true,
        ids:         None,
        order:       PlanOrder::Newest,
      })
      .await
  }

  pub async fn fetch_public_plans_by(&self, username: &str) -> Vec<WorkoutPlan> {
    or_log("fetch_public_plans_by", self.try_fetch_public_plans_by(username).await)
  }

  /// The caller's records for one exercise, oldest first.
  pub async fn try_fetch_weight_history(&self, exercise_id: Uuid) -> Result<Vec<WeightRecord>> {
    let identity = self.require_identity()?;
    let rows = self
      .backend
      .select_weight_records(exercise_id, identity.user_id)
      .await
      .map_err(GatewayError::backend)?;
    Ok(mapper::map_weight_history(rows))
  }

  pub async fn fetch_weight_history(&self, exercise_id: Uuid) -> Vec<WeightRecord> {
    or_log("fetch_weight_history", self.try_fetch_weight_history(exercise_id).await)
  }

  // ── Plan writes ───────────────────────────────────────────────────────

  /// Insert the plan row, then each day, then each day's exercises, one at a
  /// time. A failed day or exercise insert is logged and skipped, so the new
  /// plan may be missing parts of its tree.
  pub async fn try_create_plan(&self, plan: NewPlan) -> Result<Uuid> {
    let identity = self.require_identity()?;
    validate::new_plan(&plan)?;

    let row = self
      .backend
      .insert_plan(NewPlanRow {
        owner_id:    identity.user_id,
        name:        plan.name.trim().to_owned(),
        description: non_blank(plan.description),
        glyph:       non_blank(plan.glyph).unwrap_or_else(|| DEFAULT_GLYPH.to_owned()),
        is_public:   plan.is_public,
      })
      .await
      .map_err(GatewayError::backend)?;

    let skipped = self.insert_days(row.id, &plan.days).await;
    debug!(plan_id = %row.id, skipped, "plan created");
    Ok(row.id)
  }

  pub async fn create_plan(&self, plan: NewPlan) -> Option<Uuid> {
    or_log("create_plan", self.try_create_plan(plan).await.map(Some))
  }

  /// Returns the number of day and exercise inserts that failed.
  async fn insert_days(&self, plan_id: Uuid, days: &[NewDay]) -> usize {
    let mut skipped = 0;
    for (position, day) in positioned(days) {
      let inserted = self
        .backend
        .insert_day(NewDayRow {
          workout_id:  plan_id,
          weekday:     day.weekday.trim().to_owned(),
          division:    day.division.trim().to_owned(),
          is_rest_day: day.is_rest_day,
          position,
        })
        .await;
      let day_row = match inserted {
        Ok(row) => row,
        Err(err) => {
          warn!(%plan_id, position, error = %err, "day insert failed; skipping");
          skipped += 1 + day.exercises.len();
          continue;
        }
      };

      for (index, exercise) in day.exercises.iter().enumerate() {
        let result = self
          .backend
          .insert_exercise(NewExerciseRow {
            day_id:   day_row.id,
            name:     exercise.name.trim().to_owned(),
            sets:     exercise.sets,
            reps:     exercise.reps.trim().to_owned(),
            position: index as u32,
          })
          .await;
        if let Err(err) = result {
          warn!(day_id = %day_row.id, index, error = %err, "exercise insert failed; skipping");
          skipped += 1;
        }
      }
    }
    skipped
  }

  /// Update top-level fields of an owned plan. `Ok(false)` when the plan does
  /// not exist or belongs to someone else.
  pub async fn try_update_plan(&self, plan_id: Uuid, mut patch: PlanPatch) -> Result<bool> {
    let identity = self.require_identity()?;
    if let Some(name) = &patch.name {
      validate::non_empty("plan name", name)?;
    }
    patch.name = patch.name.map(|n| n.trim().to_owned());
    patch.description = patch.description.map(non_blank);
    patch.glyph = patch
      .glyph
      .map(|g| non_blank(Some(g)).unwrap_or_else(|| DEFAULT_GLYPH.to_owned()));

    let updated = self
      .backend
      .update_plan(plan_id, identity.user_id, patch)
      .await
      .map_err(GatewayError::backend)?;
    if updated.is_none() {
      debug!(%plan_id, "update matched no owned plan");
    }
    Ok(updated.is_some())
  }

  pub async fn update_plan(&self, plan_id: Uuid, patch: PlanPatch) -> bool {
    or_log("update_plan", self.try_update_plan(plan_id, patch).await)
  }

  pub async fn try_delete_plan(&self, plan_id: Uuid) -> Result<bool> {
    let identity = self.require_identity()?;
    self
      .backend
      .delete_plan(plan_id, identity.user_id)
      .await
      .map_err(GatewayError::backend)
  }

  pub async fn delete_plan(&self, plan_id: Uuid) -> bool {
    or_log("delete_plan", self.try_delete_plan(plan_id).await)
  }

  /// Replace the whole day/exercise tree of an owned plan. The old days are
  /// deleted first, which also discards weight history recorded against
  /// their exercises.
  pub async fn try_replace_plan_days(&self, plan_id: Uuid, days: Vec<NewDay>) -> Result<bool> {
    let identity = self.require_identity()?;
    validate::days(&days)?;

    let owned = self
      .backend
      .delete_days(plan_id, identity.user_id)
      .await
      .map_err(GatewayError::backend)?;
    if !owned {
      return Ok(false);
    }
    let skipped = self.insert_days(plan_id, &days).await;

    // Bump `updated_at`.
    self
      .backend
      .update_plan(plan_id, identity.user_id, PlanPatch::default())
      .await
      .map_err(GatewayError::backend)?;
    debug!(%plan_id, skipped, "plan days replaced");
    Ok(true)
  }

  pub async fn replace_plan_days(&self, plan_id: Uuid, days: Vec<NewDay>) -> bool {
    or_log("replace_plan_days", self.try_replace_plan_days(plan_id, days).await)
  }

  // ── Weight records ────────────────────────────────────────────────────

  /// Append one record for the caller. The weight is validated before any
  /// backend call.
  pub async fn try_add_weight_record(
    &self,
    exercise_id: Uuid,
    weight: f64,
    notes: Option<String>,
  ) -> Result<WeightRecord> {
    let weight = validate::weight(weight)?;
    let identity = self.require_identity()?;
    let row = self
      .backend
      .insert_weight_record(NewWeightRecordRow {
        exercise_id,
        profile_id: identity.user_id,
        weight,
        notes: non_blank(notes),
      })
      .await
      .map_err(GatewayError::backend)?;
    Ok(mapper::map_weight_record(row))
  }

  pub async fn add_weight_record(
    &self,
    exercise_id: Uuid,
    weight: f64,
    notes: Option<String>,
  ) -> bool {
    let result = self.try_add_weight_record(exercise_id, weight, notes).await;
    or_log("add_weight_record", result.map(|_| true))
  }

  // ── Links ─────────────────────────────────────────────────────────────

  pub async fn try_link(&self, kind: LinkKind, plan_id: Uuid) -> Result<LinkOutcome> {
    let identity = self.require_identity()?;
    let outcome = self
      .backend
      .insert_link(kind, identity.user_id, plan_id)
      .await
      .map_err(GatewayError::backend)?;
    debug!(%kind, %plan_id, ?outcome, "link inserted");
    Ok(outcome)
  }

  /// `Ok(false)` when there was no link to remove.
  pub async fn try_unlink(&self, kind: LinkKind, plan_id: Uuid) -> Result<bool> {
    let identity = self.require_identity()?;
    self
      .backend
      .delete_link(kind, identity.user_id, plan_id)
      .await
      .map_err(GatewayError::backend)
  }

  /// Link or unlink. Both directions are idempotent: a link that already
  /// exists (or is already gone) counts as success.
  async fn set_link(&self, op: &'static str, kind: LinkKind, plan_id: Uuid, on: bool) -> bool {
    let result = if on {
      self.try_link(kind, plan_id).await.map(|_| true)
    } else {
      self.try_unlink(kind, plan_id).await.map(|_| true)
    };
    or_log(op, result)
  }

  pub async fn like_plan(&self, plan_id: Uuid) -> bool {
    self.set_link("like_plan", LinkKind::Liked, plan_id, true).await
  }

  pub async fn unlike_plan(&self, plan_id: Uuid) -> bool {
    self.set_link("unlike_plan", LinkKind::Liked, plan_id, false).await
  }

  pub async fn save_plan(&self, plan_id: Uuid) -> bool {
    self.set_link("save_plan", LinkKind::Saved, plan_id, true).await
  }

  pub async fn unsave_plan(&self, plan_id: Uuid) -> bool {
    self.set_link("unsave_plan", LinkKind::Saved, plan_id, false).await
  }

  // ── Profiles ──────────────────────────────────────────────────────────

  pub async fn try_current_profile(&self) -> Result<Option<Profile>> {
    let identity = self.require_identity()?;
    let row = self
      .backend
      .get_profile(identity.user_id)
      .await
      .map_err(GatewayError::backend)?;
    Ok(row.map(mapper::map_profile))
  }

  pub async fn current_profile(&self) -> Option<Profile> {
    or_log("current_profile", self.try_current_profile().await)
  }

  /// The caller's profile, created on the spot if it does not exist yet.
  ///
  /// `username` is used when free; otherwise one is generated from the
  /// email address. `name` defaults to the email's local part.
  pub async fn ensure_profile(
    &self,
    name: Option<&str>,
    username: Option<&str>,
  ) -> Result<Profile> {
    let identity = self.require_identity()?;
    if let Some(row) = self
      .backend
      .get_profile(identity.user_id)
      .await
      .map_err(GatewayError::backend)?
    {
      return Ok(mapper::map_profile(row));
    }

    let username = match username {
      Some(wanted) if self.is_username_available(wanted).await? => wanted.to_owned(),
      _ => self.generate_unique_username(&identity.email).await?,
    };
    let name = name
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .map(str::to_owned)
      .unwrap_or_else(|| default_display_name(&identity.email));

    let row = self
      .backend
      .insert_profile(NewProfileRow {
        id: identity.user_id,
        username,
        name,
        email: identity.email.clone(),
      })
      .await
      .map_err(GatewayError::backend)?;
    debug!(user_id = %identity.user_id, username = %row.username, "profile created");
    Ok(mapper::map_profile(row))
  }

  /// Patch the caller's profile row. A username held by someone else is
  /// rejected with [`ErrorKind::UsernameTaken`].
  pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile> {
    if let Some(username) = &patch.username {
      validate::username(username)?;
    }
    if let Some(name) = &patch.name {
      validate::non_empty("name", name)?;
    }
    if let Some(email) = &patch.email {
      validate::email(email)?;
    }

    let current = self.ensure_profile(None, None).await?;
    if patch.is_empty() {
      return Ok(current);
    }
    let patch = ProfilePatch {
      username: patch.username.map(|u| u.trim().to_owned()),
      name:     patch.name.map(|n| n.trim().to_owned()),
      email:    patch.email.map(|e| e.trim().to_owned()),
    };
    let row = self
      .backend
      .update_profile(current.id, patch)
      .await
      .map_err(GatewayError::backend)?
      .ok_or(GatewayError::ProfileNotFound(current.id))?;
    Ok(mapper::map_profile(row))
  }

  pub async fn try_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
    let row = self
      .backend
      .find_profile_by_username(username.trim())
      .await
      .map_err(GatewayError::backend)?;
    Ok(row.map(mapper::map_profile))
  }

  pub async fn profile_by_username(&self, username: &str) -> Option<Profile> {
    or_log("profile_by_username", self.try_profile_by_username(username).await)
  }

  /// Usernames compare case-insensitively.
  pub async fn is_username_available(&self, username: &str) -> Result<bool> {
    Ok(self.try_profile_by_username(username).await?.is_none())
  }

  /// First free candidate among `base`, `base1`, `base2`, ... where `base`
  /// is derived from the email address.
  pub async fn generate_unique_username(&self, email: &str) -> Result<String> {
    let base = username_base(email);
    for suffix in 0..=MAX_USERNAME_SUFFIX {
      let candidate = match suffix {
        0 => base.clone(),
        n => format!("{base}{n}"),
      };
      if self.is_username_available(&candidate).await? {
        return Ok(candidate);
      }
    }
    let fallback = fallback_username(&base, Uuid::new_v4());
    warn!(%base, %fallback, "sequential username candidates exhausted");
    Ok(fallback)
  }

  /// Counts over the plans of `profile_id` that the caller can see.
  pub async fn try_profile_stats(&self, profile_id: Uuid) -> Result<ProfileStats> {
    let plans = self
      .backend
      .select_plans(PlanQuery {
        viewer: self.viewer(),
        owner: Some(profile_id),
        ..PlanQuery::default()
      })
      .await
      .map_err(GatewayError::backend)?;

    Ok(ProfileStats {
      plan_count:        plans.len(),
      public_plan_count: plans.iter().filter(|p| p.is_public).count(),
      likes_received:    plans
        .iter()
        .map(|p| u64::try_from(p.like_count).unwrap_or(0))
        .sum(),
    })
  }

  pub async fn profile_stats(&self, profile_id: Uuid) -> ProfileStats {
    or_log("profile_stats", self.try_profile_stats(profile_id).await)
  }
}

/// `base_` plus eight hex digits of `token`, with `base` shortened so the
/// result stays within [`validate::MAX_USERNAME_LEN`].
fn fallback_username(base: &str, token: Uuid) -> String {
  let suffix = &token.simple().to_string()[..8];
  let keep = validate::MAX_USERNAME_LEN - suffix.len() - 1;
  let base: String = base.chars().take(keep).collect();
  format!("{base}_{suffix}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fallback_username_fits_the_length_limit() {
    let base = username_base("abcdefghijklmnopqrstuvwxyz0123@example.com");
    assert_eq!(base.len(), 24);

    let name = fallback_username(&base, Uuid::new_v4());
    assert_eq!(name.chars().count(), validate::MAX_USERNAME_LEN);
    assert!(name.starts_with("abcdefghijklmnopqrstu_"));
    validate::username(&name).unwrap();
  }

  #[test]
  fn fallback_username_keeps_short_bases() {
    let name = fallback_username("ana", Uuid::nil());
    assert_eq!(name, "ana_00000000");
  }
}
