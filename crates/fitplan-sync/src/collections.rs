//! The collection store: the client's in-memory copy of the three plan lists
//! (own, saved, public), refreshed from the gateway.
//!
//! Each list lives in its own [`watch`] channel. Mutators write through the
//! gateway and then refetch the lists the write can affect; local state is
//! never patched in place.

use std::sync::atomic::{AtomicU64, Ordering};

use fitplan_core::{
  Backend,
  plan::{NewDay, NewPlan, WeightRecord, WorkoutPlan},
  row::PlanPatch,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error};
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError, Result};

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
  Own,
  Saved,
  Public,
}

impl CollectionKind {
  pub const ALL: [Self; 3] = [Self::Own, Self::Saved, Self::Public];
}

/// What happens to a collection's items when a refresh fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
  /// Drop the items; the collection shows as empty.
  #[default]
  Clear,
  /// Keep the last successfully fetched items.
  KeepLast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
  pub on_fetch_error: FetchErrorPolicy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
  /// Never fetched.
  #[default]
  Idle,
  /// A fetch is in flight; items are those of the previous state.
  Loading,
  Ready,
  /// The latest fetch failed.
  Failed(String),
}

/// Snapshot of one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
  pub state: LoadState,
  pub plans: Vec<WorkoutPlan>,
}

impl Collection {
  pub fn get(&self, plan_id: Uuid) -> Option<&WorkoutPlan> {
    self.plans.iter().find(|p| p.id == plan_id)
  }

  pub fn contains(&self, plan_id: Uuid) -> bool { self.get(plan_id).is_some() }
}

struct Slot {
  tx:        watch::Sender<Collection>,
  /// Generation of the most recently started refresh.
  requested: AtomicU64,
  /// Generation of the most recently applied result.
  applied:   AtomicU64,
}

impl Slot {
  fn new() -> Self {
    Self {
      tx:        watch::channel(Collection::default()).0,
      requested: AtomicU64::new(0),
      applied:   AtomicU64::new(0),
    }
  }

  /// Mark a refresh as started and return its generation.
  fn begin(&self) -> u64 {
    let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
    self.tx.send_modify(|c| c.state = LoadState::Loading);
    generation
  }

  /// Apply the result of refresh `generation`. Returns `false` if a newer
  /// refresh was already applied and the result was dropped.
  fn apply(
    &self,
    generation: u64,
    result: Result<Vec<WorkoutPlan>>,
    policy: FetchErrorPolicy,
  ) -> bool {
    let mut fresh = false;
    self.tx.send_if_modified(|c| {
      if generation <= self.applied.load(Ordering::SeqCst) {
        return false;
      }
      fresh = true;
      self.applied.store(generation, Ordering::SeqCst);
      let newer_pending = self.requested.load(Ordering::SeqCst) > generation;

      match result {
        Ok(plans) => {
          debug!(generation, count = plans.len(), "collection refreshed");
          c.plans = plans;
          c.state = if newer_pending { LoadState::Loading } else { LoadState::Ready };
        }
        Err(err) => {
          error!(generation, error = %err, "collection refresh failed");
          if policy == FetchErrorPolicy::Clear {
            c.plans.clear();
          }
          c.state = LoadState::Failed(err.to_string());
        }
      }
      true
    });
    fresh
  }

  /// Back to `Idle`; results of refreshes already started are dropped.
  fn reset(&self) {
    self.tx.send_modify(|c| {
      let latest = self.requested.load(Ordering::SeqCst);
      self.applied.store(latest, Ordering::SeqCst);
      *c = Collection::default();
    });
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct CollectionStore<B> {
  gateway: Gateway<B>,
  options: StoreOptions,
  own:     Slot,
  saved:   Slot,
  public:  Slot,
}

impl<B: Backend> CollectionStore<B> {
  pub fn new(gateway: Gateway<B>, options: StoreOptions) -> Self {
    Self {
      gateway,
      options,
      own: Slot::new(),
      saved: Slot::new(),
      public: Slot::new(),
    }
  }

  fn slot(&self, kind: CollectionKind) -> &Slot {
    match kind {
      CollectionKind::Own => &self.own,
      CollectionKind::Saved => &self.saved,
      CollectionKind::Public => &self.public,
    }
  }

  // ── Accessors ─────────────────────────────────────────────────────────

  pub fn snapshot(&self, kind: CollectionKind) -> Collection {
    self.slot(kind).tx.borrow().clone()
  }

  pub fn plans(&self, kind: CollectionKind) -> Vec<WorkoutPlan> {
    self.slot(kind).tx.borrow().plans.clone()
  }

  pub fn state(&self, kind: CollectionKind) -> LoadState {
    self.slot(kind).tx.borrow().state.clone()
  }

  pub fn subscribe(&self, kind: CollectionKind) -> watch::Receiver<Collection> {
    self.slot(kind).tx.subscribe()
  }

  /// Look a plan up in own, then saved, then public.
  pub fn plan(&self, plan_id: Uuid) -> Option<WorkoutPlan> {
    CollectionKind::ALL
      .into_iter()
      .find_map(|kind| self.slot(kind).tx.borrow().get(plan_id).cloned())
  }

  pub fn is_saved(&self, plan_id: Uuid) -> bool {
    // Release the saved-slot borrow before `plan` borrows every slot again.
    let in_saved = self.saved.tx.borrow().contains(plan_id);
    in_saved || self.plan(plan_id).is_some_and(|p| p.is_saved)
  }

  pub fn is_liked(&self, plan_id: Uuid) -> bool {
    self.plan(plan_id).is_some_and(|p| p.is_liked)
  }

  /// The cached history of one exercise, oldest first. Empty when the
  /// exercise is not in any loaded plan.
  pub fn weight_history(&self, exercise_id: Uuid) -> Vec<WeightRecord> {
    CollectionKind::ALL
      .into_iter()
      .find_map(|kind| {
        let collection = self.slot(kind).tx.borrow();
        collection
          .plans
          .iter()
          .find_map(|p| p.exercise(exercise_id))
          .map(|e| e.weight_history.clone())
      })
      .unwrap_or_default()
  }

  // ── Refresh ───────────────────────────────────────────────────────────

  async fn fetch(&self, kind: CollectionKind) -> Result<Vec<WorkoutPlan>> {
    let result = match kind {
      CollectionKind::Own => self.gateway.try_fetch_own_plans().await,
      CollectionKind::Saved => self.gateway.try_fetch_saved_plans().await,
      CollectionKind::Public => self.gateway.try_fetch_public_plans().await,
    };
    match result {
      // Signed out: identity-scoped collections are simply empty.
      Err(GatewayError::NotAuthenticated) => Ok(Vec::new()),
      other => other,
    }
  }

  /// Refetch one collection and replace its items wholesale.
  ///
  /// A result that arrives after a newer refresh of the same collection has
  /// already been applied is discarded.
  pub async fn refresh(&self, kind: CollectionKind) {
    let slot = self.slot(kind);
    let generation = slot.begin();
    let result = self.fetch(kind).await;
    if !slot.apply(generation, result, self.options.on_fetch_error) {
      debug!(?kind, generation, "discarded stale refresh");
    }
  }

  pub async fn refresh_many(&self, kinds: &[CollectionKind]) {
    for kind in kinds {
      self.refresh(*kind).await;
    }
  }

  pub async fn refresh_all(&self) { self.refresh_many(&CollectionKind::ALL).await }

  /// Return every collection to `Idle` and drop its items, e.g. after
  /// sign-out. In-flight refreshes started before the reset are discarded.
  pub fn reset(&self) {
    for kind in CollectionKind::ALL {
      self.slot(kind).reset();
    }
  }

  // ── Mutators ──────────────────────────────────────────────────────────

  async fn then_refresh(&self, ok: bool, kinds: &[CollectionKind]) -> bool {
    if ok {
      self.refresh_many(kinds).await;
    }
    ok
  }

  pub async fn create_plan(&self, plan: NewPlan) -> Option<Uuid> {
    let kinds: &[CollectionKind] = if plan.is_public {
      &[CollectionKind::Own, CollectionKind::Public]
    } else {
      &[CollectionKind::Own]
    };
    let id = self.gateway.create_plan(plan).await?;
    self.refresh_many(kinds).await;
    Some(id)
  }

  pub async fn update_plan(&self, plan_id: Uuid, patch: PlanPatch) -> bool {
    let ok = self.gateway.update_plan(plan_id, patch).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn delete_plan(&self, plan_id: Uuid) -> bool {
    let ok = self.gateway.delete_plan(plan_id).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn replace_plan_days(&self, plan_id: Uuid, days: Vec<NewDay>) -> bool {
    let ok = self.gateway.replace_plan_days(plan_id, days).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn add_weight_record(
    &self,
    exercise_id: Uuid,
    weight: f64,
    notes: Option<String>,
  ) -> bool {
    let ok = self.gateway.add_weight_record(exercise_id, weight, notes).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn like_plan(&self, plan_id: Uuid) -> bool {
    let ok = self.gateway.like_plan(plan_id).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn unlike_plan(&self, plan_id: Uuid) -> bool {
    let ok = self.gateway.unlike_plan(plan_id).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn save_plan(&self, plan_id: Uuid) -> bool {
    let ok = self.gateway.save_plan(plan_id).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }

  pub async fn unsave_plan(&self, plan_id: Uuid) -> bool {
    let ok = self.gateway.unsave_plan(plan_id).await;
    self.then_refresh(ok, &CollectionKind::ALL).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn plan(name: &str) -> WorkoutPlan {
    WorkoutPlan {
      id:             Uuid::new_v4(),
      owner_id:       Uuid::new_v4(),
      owner_username: "ana".into(),
      name:           name.into(),
      description:    None,
      glyph:          "💪".into(),
      is_public:      true,
      like_count:     0,
      created_at:     Utc::now(),
      updated_at:     Utc::now(),
      days:           Vec::new(),
      is_liked:       false,
      is_saved:       false,
    }
  }

  fn names(slot: &Slot) -> Vec<String> {
    slot.tx.borrow().plans.iter().map(|p| p.name.clone()).collect()
  }

  #[test]
  fn later_request_wins_regardless_of_arrival_order() {
    let slot = Slot::new();
    let first = slot.begin();
    let second = slot.begin();

    assert!(slot.apply(second, Ok(vec![plan("second")]), FetchErrorPolicy::Clear));
    assert!(!slot.apply(first, Ok(vec![plan("first")]), FetchErrorPolicy::Clear));

    assert_eq!(names(&slot), ["second"]);
    assert_eq!(slot.tx.borrow().state, LoadState::Ready);
  }

  #[test]
  fn older_result_applies_while_newer_is_pending() {
    let slot = Slot::new();
    let first = slot.begin();
    let _second = slot.begin();

    assert!(slot.apply(first, Ok(vec![plan("first")]), FetchErrorPolicy::Clear));
    assert_eq!(names(&slot), ["first"]);
    assert_eq!(slot.tx.borrow().state, LoadState::Loading);
  }

  #[test]
  fn failure_clears_items_by_default() {
    let slot = Slot::new();
    let g = slot.begin();
    slot.apply(g, Ok(vec![plan("kept?")]), FetchErrorPolicy::Clear);

    let g = slot.begin();
    assert_eq!(names(&slot), ["kept?"], "items stay visible while loading");
    slot.apply(g, Err(GatewayError::ProfileNotFound(Uuid::nil())), FetchErrorPolicy::Clear);

    let snapshot = slot.tx.borrow().clone();
    assert!(snapshot.plans.is_empty());
    assert!(matches!(snapshot.state, LoadState::Failed(_)));
  }

  #[test]
  fn keep_last_policy_retains_items_on_failure() {
    let slot = Slot::new();
    let g = slot.begin();
    slot.apply(g, Ok(vec![plan("kept")]), FetchErrorPolicy::KeepLast);

    let g = slot.begin();
    slot.apply(g, Err(GatewayError::ProfileNotFound(Uuid::nil())), FetchErrorPolicy::KeepLast);

    assert_eq!(names(&slot), ["kept"]);
    assert!(matches!(slot.tx.borrow().state, LoadState::Failed(_)));
  }

  #[test]
  fn reset_discards_in_flight_results() {
    let slot = Slot::new();
    let g = slot.begin();
    slot.reset();
    assert!(!slot.apply(g, Ok(vec![plan("late")]), FetchErrorPolicy::Clear));
    assert_eq!(slot.tx.borrow().state, LoadState::Idle);
    assert!(names(&slot).is_empty());
  }

  #[test]
  fn fetch_error_policy_reads_snake_case() {
    #[derive(Deserialize)]
    struct Wrapper {
      policy: FetchErrorPolicy,
    }
    let w: Wrapper = toml::from_str("policy = \"keep_last\"").unwrap();
    assert_eq!(w.policy, FetchErrorPolicy::KeepLast);
  }
}
