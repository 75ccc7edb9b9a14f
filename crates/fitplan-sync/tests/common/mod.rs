//! Shared fixtures for the client-layer integration tests.

#![allow(dead_code)]

pub mod flaky;

use std::sync::Arc;

use fitplan_core::{
  Backend,
  auth::Identity,
  plan::{NewDay, NewExercise, NewPlan},
};
use fitplan_store_sqlite::SqliteBackend;
use fitplan_sync::{Client, Registration, StoreOptions};

use self::flaky::{Faults, FlakyBackend};

pub type TestClient = Client<SqliteBackend>;

pub async fn client() -> TestClient {
  let backend = SqliteBackend::open_in_memory()
    .await
    .expect("in-memory backend");
  Client::start(backend, StoreOptions::default()).await
}

/// Two clients over one database, each with its own session.
pub async fn pair() -> (TestClient, TestClient) {
  let first = SqliteBackend::open_in_memory()
    .await
    .expect("in-memory backend");
  let second = first.fork_session();
  (
    Client::start(first, StoreOptions::default()).await,
    Client::start(second, StoreOptions::default()).await,
  )
}

/// A client whose backend fails the calls armed on the returned [`Faults`].
pub async fn flaky_client() -> (Client<FlakyBackend>, Arc<Faults>) {
  let (backend, faults) = FlakyBackend::new().await;
  (Client::start(backend, StoreOptions::default()).await, faults)
}

pub fn registration(email: &str, name: &str) -> Registration {
  Registration {
    email:            email.into(),
    password:         "secret123".into(),
    confirm_password: "secret123".into(),
    name:             name.into(),
    username:         None,
  }
}

pub async fn register<B: Backend + 'static>(
  client: &Client<B>,
  email: &str,
  name: &str,
) -> Identity {
  client
    .session
    .register(registration(email, name))
    .await
    .expect("registration")
}

/// Monday rest, Tuesday Push with Bench Press 3 x "8-12".
pub fn ppl() -> NewPlan {
  NewPlan::new("PPL")
    .with_day(NewDay::rest("Monday"))
    .with_day(
      NewDay::training("Tuesday", "Push").with_exercise(NewExercise::new("Bench Press", 3, "8-12")),
    )
}

pub fn public(name: &str) -> NewPlan {
  let mut plan = NewPlan::new(name);
  plan.is_public = true;
  plan
}
