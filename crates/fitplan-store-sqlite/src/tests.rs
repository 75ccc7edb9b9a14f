//! Integration tests for `SqliteBackend` against an in-memory database.

use fitplan_core::{
  auth::{AuthEvent, Credentials, UserAttributes},
  link::{LinkKind, LinkOutcome},
  row::{
    NewDayRow, NewExerciseRow, NewPlanRow, NewProfileRow, NewWeightRecordRow,
    PlanPatch, PlanRow, ProfilePatch,
  },
  store::{Backend, BackendError as _, ErrorKind, PlanQuery},
};
use uuid::Uuid;

use crate::SqliteBackend;

async fn backend() -> SqliteBackend {
  SqliteBackend::open_in_memory()
    .await
    .expect("in-memory backend")
}

/// Sign up `email` on `b` and create a matching profile. Returns the user id.
async fn user(b: &SqliteBackend, email: &str, username: &str) -> Uuid {
  let session = b
    .sign_up(Credentials::new(email, "secret123"))
    .await
    .unwrap();
  b.insert_profile(NewProfileRow {
    id:       session.user.user_id,
    username: username.into(),
    name:     username.into(),
    email:    email.into(),
  })
  .await
  .unwrap();
  session.user.user_id
}

async fn plan(b: &SqliteBackend, owner: Uuid, name: &str, is_public: bool) -> PlanRow {
  b.insert_plan(NewPlanRow {
    owner_id: owner,
    name: name.into(),
    description: None,
    glyph: "🏋".into(),
    is_public,
  })
  .await
  .unwrap()
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_signs_in_and_emits_event() {
  let b = backend().await;
  let mut events = b.subscribe_auth();

  let session = b
    .sign_up(Credentials::new("ana@example.com", "secret123"))
    .await
    .unwrap();
  assert_eq!(session.user.email, "ana@example.com");
  assert_eq!(b.current_session(), Some(session.clone()));
  assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(session));
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
  let b = backend().await;
  b.sign_up(Credentials::new("ana@example.com", "secret123"))
    .await
    .unwrap();

  let err = b
    .sign_up(Credentials::new("ANA@example.com", "other-pass"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmailTaken);
}

#[tokio::test]
async fn sign_in_checks_password() {
  let b = backend().await;
  b.sign_up(Credentials::new("ana@example.com", "secret123"))
    .await
    .unwrap();
  b.sign_out().await.unwrap();
  assert!(b.current_session().is_none());

  let err = b
    .sign_in(Credentials::new("ana@example.com", "wrong-pass"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

  let err = b
    .sign_in(Credentials::new("nobody@example.com", "secret123"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

  let session = b
    .sign_in(Credentials::new("ana@example.com", "secret123"))
    .await
    .unwrap();
  assert_eq!(b.current_session(), Some(session));
}

#[tokio::test]
async fn sign_out_without_session_is_a_no_op() {
  let b = backend().await;
  let mut events = b.subscribe_auth();
  b.sign_out().await.unwrap();
  assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn update_user_requires_session_and_changes_password() {
  let b = backend().await;
  let err = b
    .update_user(UserAttributes { email: None, password: Some("newpass1".into()) })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unauthenticated);

  b.sign_up(Credentials::new("ana@example.com", "secret123"))
    .await
    .unwrap();
  let identity = b
    .update_user(UserAttributes {
      email:    Some("ana@new.example".into()),
      password: Some("newpass1".into()),
    })
    .await
    .unwrap();
  assert_eq!(identity.email, "ana@new.example");
  assert_eq!(b.current_session().unwrap().user.email, "ana@new.example");

  b.sign_out().await.unwrap();
  b.sign_in(Credentials::new("ana@new.example", "newpass1"))
    .await
    .unwrap();
}

#[tokio::test]
async fn reset_password_succeeds_for_unknown_email() {
  let b = backend().await;
  let mut events = b.subscribe_auth();
  b.reset_password_for_email("ghost@example.com").await.unwrap();
  assert_eq!(events.recv().await.unwrap(), AuthEvent::PasswordRecovery {
    email: "ghost@example.com".into(),
  });
}

#[tokio::test]
async fn forked_sessions_are_independent() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;

  assert_eq!(a.current_session().unwrap().user.user_id, ana);
  assert_eq!(b.current_session().unwrap().user.user_id, ben);
}

#[tokio::test]
async fn session_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("fitplan.db");

  let user_id = {
    let b = SqliteBackend::open(&path).await.unwrap();
    b.sign_up(Credentials::new("ana@example.com", "secret123"))
      .await
      .unwrap()
      .user
      .user_id
  };

  let b = SqliteBackend::open(&path).await.unwrap();
  assert_eq!(b.current_session().unwrap().user.user_id, user_id);

  b.sign_out().await.unwrap();
  drop(b);
  let b = SqliteBackend::open(&path).await.unwrap();
  assert!(b.current_session().is_none());
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn usernames_are_unique() {
  let a = backend().await;
  let b = a.fork_session();
  user(&a, "ana@example.com", "lifter").await;
  let ben = b
    .sign_up(Credentials::new("ben@example.com", "secret123"))
    .await
    .unwrap()
    .user
    .user_id;

  let err = b
    .insert_profile(NewProfileRow {
      id:       ben,
      username: "Lifter".into(),
      name:     "Ben".into(),
      email:    "ben@example.com".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UsernameTaken);

  let found = b.find_profile_by_username("LIFTER").await.unwrap().unwrap();
  assert_eq!(found.email, "ana@example.com");
}

#[tokio::test]
async fn update_profile_patches_fields() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;

  let updated = b
    .update_profile(ana, ProfilePatch {
      name: Some("Ana Lima".into()),
      ..ProfilePatch::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "Ana Lima");
  assert_eq!(updated.username, "ana");

  let missing = b
    .update_profile(Uuid::new_v4(), ProfilePatch {
      name: Some("x".into()),
      ..ProfilePatch::default()
    })
    .await
    .unwrap();
  assert!(missing.is_none());
}

// ─── Plans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn select_plans_embeds_ordered_tree() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let p = plan(&b, ana, "PPL", false).await;

  // Inserted out of order on purpose.
  for (position, weekday) in [(1, "Tuesday"), (0, "Monday")] {
    let day = b
      .insert_day(NewDayRow {
        workout_id: p.id,
        weekday: weekday.into(),
        division: "Push".into(),
        is_rest_day: false,
        position,
      })
      .await
      .unwrap();
    b.insert_exercise(NewExerciseRow {
      day_id:   day.id,
      name:     format!("{weekday} press"),
      sets:     3,
      reps:     "8-12".into(),
      position: 0,
    })
    .await
    .unwrap();
  }

  let plans = b.select_plans(PlanQuery::owned_by(ana)).await.unwrap();
  assert_eq!(plans.len(), 1);
  let days = plans[0].workout_days.as_ref().unwrap();
  let weekdays: Vec<_> = days.iter().map(|d| d.weekday.as_str()).collect();
  assert_eq!(weekdays, ["Monday", "Tuesday"]);
  assert_eq!(days[0].exercises.as_ref().unwrap()[0].name, "Monday press");
  assert_eq!(plans[0].owner.as_ref().unwrap().username, "ana");
}

#[tokio::test]
async fn private_plans_are_invisible_to_others() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;
  let private = plan(&a, ana, "Secret", false).await;
  let public = plan(&a, ana, "Open", true).await;

  let seen = b
    .select_plans(PlanQuery::by_ids(ben, vec![private.id, public.id]))
    .await
    .unwrap();
  let ids: Vec<_> = seen.iter().map(|p| p.id).collect();
  assert_eq!(ids, [public.id]);

  let anonymous = b.select_plans(PlanQuery::public(None)).await.unwrap();
  assert_eq!(anonymous.len(), 1);
}

#[tokio::test]
async fn empty_id_list_selects_nothing() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  plan(&b, ana, "PPL", true).await;
  let none = b.select_plans(PlanQuery::by_ids(ana, vec![])).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn writes_are_owner_scoped() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;
  let p = plan(&a, ana, "PPL", true).await;

  let patch = PlanPatch { name: Some("Mine now".into()), ..PlanPatch::default() };
  assert!(b.update_plan(p.id, ben, patch.clone()).await.unwrap().is_none());
  assert!(!b.delete_plan(p.id, ben).await.unwrap());
  assert!(!b.delete_days(p.id, ben).await.unwrap());

  let updated = a.update_plan(p.id, ana, patch).await.unwrap().unwrap();
  assert_eq!(updated.name, "Mine now");
  assert!(a.delete_plan(p.id, ana).await.unwrap());
}

#[tokio::test]
async fn update_plan_can_clear_description() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let p = b
    .insert_plan(NewPlanRow {
      owner_id:    ana,
      name:        "PPL".into(),
      description: Some("Six days".into()),
      glyph:       "💪".into(),
      is_public:   false,
    })
    .await
    .unwrap();

  let kept = b
    .update_plan(p.id, ana, PlanPatch { is_public: Some(true), ..PlanPatch::default() })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(kept.description.as_deref(), Some("Six days"));
  assert!(kept.is_public);

  let cleared = b
    .update_plan(p.id, ana, PlanPatch { description: Some(None), ..PlanPatch::default() })
    .await
    .unwrap()
    .unwrap();
  assert!(cleared.description.is_none());
}

#[tokio::test]
async fn duplicate_day_position_is_a_constraint_error() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let p = plan(&b, ana, "PPL", false).await;
  let day = |weekday: &str| NewDayRow {
    workout_id:  p.id,
    weekday:     weekday.into(),
    division:    String::new(),
    is_rest_day: true,
    position:    0,
  };
  b.insert_day(day("Monday")).await.unwrap();
  let err = b.insert_day(day("Tuesday")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[tokio::test]
async fn duplicate_exercise_position_is_a_constraint_error() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let p = plan(&b, ana, "PPL", false).await;
  let day = b
    .insert_day(NewDayRow {
      workout_id:  p.id,
      weekday:     "Tuesday".into(),
      division:    "Push".into(),
      is_rest_day: false,
      position:    0,
    })
    .await
    .unwrap();
  let exercise = |name: &str| NewExerciseRow {
    day_id:   day.id,
    name:     name.into(),
    sets:     3,
    reps:     "8-12".into(),
    position: 0,
  };
  b.insert_exercise(exercise("Bench Press")).await.unwrap();
  let err = b.insert_exercise(exercise("Dips")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[tokio::test]
async fn deleting_a_plan_cascades() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let p = plan(&b, ana, "PPL", true).await;
  let day = b
    .insert_day(NewDayRow {
      workout_id:  p.id,
      weekday:     "Monday".into(),
      division:    "Push".into(),
      is_rest_day: false,
      position:    0,
    })
    .await
    .unwrap();
  let ex = b
    .insert_exercise(NewExerciseRow {
      day_id:   day.id,
      name:     "Bench".into(),
      sets:     3,
      reps:     "8".into(),
      position: 0,
    })
    .await
    .unwrap();
  b.insert_weight_record(NewWeightRecordRow {
    exercise_id: ex.id,
    profile_id:  ana,
    weight:      60.0,
    notes:       None,
  })
  .await
  .unwrap();
  b.insert_link(LinkKind::Saved, ana, p.id).await.unwrap();

  assert!(b.delete_plan(p.id, ana).await.unwrap());
  assert!(b.select_weight_records(ex.id, ana).await.unwrap().is_empty());
  assert!(b.select_links(LinkKind::Saved, ana).await.unwrap().is_empty());
}

// ─── Weight records ──────────────────────────────────────────────────────────

#[tokio::test]
async fn weight_records_are_private_and_ordered() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;
  let p = plan(&a, ana, "PPL", true).await;
  let day = a
    .insert_day(NewDayRow {
      workout_id:  p.id,
      weekday:     "Monday".into(),
      division:    "Legs".into(),
      is_rest_day: false,
      position:    0,
    })
    .await
    .unwrap();
  let ex = a
    .insert_exercise(NewExerciseRow {
      day_id:   day.id,
      name:     "Squat".into(),
      sets:     5,
      reps:     "5".into(),
      position: 0,
    })
    .await
    .unwrap();

  for (who, weight) in [(ana, 100.0), (ben, 80.0), (ana, 102.5)] {
    a.insert_weight_record(NewWeightRecordRow {
      exercise_id: ex.id,
      profile_id:  who,
      weight,
      notes:       None,
    })
    .await
    .unwrap();
  }

  let mine: Vec<f64> = a
    .select_weight_records(ex.id, ana)
    .await
    .unwrap()
    .iter()
    .map(|r| r.weight)
    .collect();
  assert_eq!(mine, [100.0, 102.5]);

  let bens_view = b.select_plans(PlanQuery::public(Some(ben))).await.unwrap();
  let records = bens_view[0].workout_days.as_ref().unwrap()[0]
    .exercises
    .as_ref()
    .unwrap()[0]
    .weight_records
    .as_ref()
    .unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].weight, 80.0);
}

#[tokio::test]
async fn weight_record_for_missing_exercise_is_not_found() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let err = b
    .insert_weight_record(NewWeightRecordRow {
      exercise_id: Uuid::new_v4(),
      profile_id:  ana,
      weight:      50.0,
      notes:       None,
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_like_keeps_one_link_and_counts_once() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;
  let p = plan(&a, ana, "PPL", true).await;

  assert_eq!(b.insert_link(LinkKind::Liked, ben, p.id).await.unwrap(), LinkOutcome::Created);
  assert_eq!(
    b.insert_link(LinkKind::Liked, ben, p.id).await.unwrap(),
    LinkOutcome::AlreadyExists
  );
  assert_eq!(b.select_links(LinkKind::Liked, ben).await.unwrap().len(), 1);

  let like_count = |plans: Vec<PlanRow>| plans[0].like_count;
  let plans = b.select_plans(PlanQuery::by_ids(ben, vec![p.id])).await.unwrap();
  assert_eq!(like_count(plans), 1);

  assert!(b.delete_link(LinkKind::Liked, ben, p.id).await.unwrap());
  assert!(!b.delete_link(LinkKind::Liked, ben, p.id).await.unwrap());
  let plans = b.select_plans(PlanQuery::by_ids(ben, vec![p.id])).await.unwrap();
  assert_eq!(like_count(plans), 0);
}

#[tokio::test]
async fn cannot_link_invisible_plan() {
  let a = backend().await;
  let b = a.fork_session();
  let ana = user(&a, "ana@example.com", "ana").await;
  let ben = user(&b, "ben@example.com", "ben").await;
  let p = plan(&a, ana, "Secret", false).await;

  let err = b.insert_link(LinkKind::Saved, ben, p.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn links_are_listed_most_recent_first() {
  let b = backend().await;
  let ana = user(&b, "ana@example.com", "ana").await;
  let first = plan(&b, ana, "First", true).await;
  let second = plan(&b, ana, "Second", true).await;
  b.insert_link(LinkKind::Saved, ana, first.id).await.unwrap();
  b.insert_link(LinkKind::Saved, ana, second.id).await.unwrap();

  let ids: Vec<_> = b
    .select_links(LinkKind::Saved, ana)
    .await
    .unwrap()
    .into_iter()
    .map(|l| l.workout_id)
    .collect();
  assert_eq!(ids, [second.id, first.id]);
}
