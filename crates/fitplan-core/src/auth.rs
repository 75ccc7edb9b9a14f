//! Authentication types shared between backends and the session layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is signed in. Read-only to everything except the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: Uuid,
  pub email:   String,
}

/// An authenticated backend session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  /// Opaque bearer token.
  pub access_token: String,
  pub user:         Identity,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self { email: email.into(), password: password.into() }
  }
}

/// Changes to the signed-in auth user; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserAttributes {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// Session-change notification emitted by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
  SignedIn(Session),
  SignedOut,
  UserUpdated(Session),
  /// A password-reset email was requested.
  PasswordRecovery { email: String },
}
