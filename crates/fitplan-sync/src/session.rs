//! The session provider: tracks who is signed in and wraps the backend's
//! auth API.

use std::sync::Arc;

use fitplan_core::{
  Backend, ValidationError,
  auth::{Credentials, Identity, UserAttributes},
  profile::Profile,
  row::ProfilePatch,
  store::{BackendError, ErrorKind},
  validate,
};
use thiserror::Error;
use tokio::{
  sync::{broadcast::error::RecvError, watch},
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::gateway::{Gateway, GatewayError};

// ─── State ───────────────────────────────────────────────────────────────────

/// What the rest of the client knows about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
  pub identity: Option<Identity>,
  /// `true` until the initial session has been read from the backend.
  pub loading:  bool,
}

impl SessionState {
  pub fn is_authenticated(&self) -> bool { self.identity.is_some() }
}

// ─── Failures ────────────────────────────────────────────────────────────────

/// A failed auth action. The `Display` text is meant to be shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthFailure {
  #[error(transparent)]
  Invalid(#[from] ValidationError),

  #[error("Invalid email or password.")]
  InvalidCredentials,

  #[error("An account with this email already exists.")]
  EmailTaken,

  #[error("That username is already taken.")]
  UsernameTaken,

  #[error("You need to sign in first.")]
  NotSignedIn,

  #[error("Something went wrong: {0}")]
  Unexpected(String),
}

impl AuthFailure {
  fn from_backend<E: BackendError>(err: &E) -> Self {
    match err.kind() {
      ErrorKind::InvalidCredentials => Self::InvalidCredentials,
      ErrorKind::EmailTaken => Self::EmailTaken,
      ErrorKind::UsernameTaken => Self::UsernameTaken,
      ErrorKind::Unauthenticated => Self::NotSignedIn,
      ErrorKind::NotFound | ErrorKind::Duplicate | ErrorKind::Other => {
        Self::Unexpected(err.to_string())
      }
    }
  }
}

impl From<GatewayError> for AuthFailure {
  fn from(err: GatewayError) -> Self {
    match err {
      GatewayError::NotAuthenticated => Self::NotSignedIn,
      GatewayError::Core(fitplan_core::Error::Validation(v)) => Self::Invalid(v),
      GatewayError::Backend { kind: ErrorKind::UsernameTaken, .. } => Self::UsernameTaken,
      GatewayError::Backend { kind: ErrorKind::EmailTaken, .. } => Self::EmailTaken,
      other => Self::Unexpected(other.to_string()),
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct Registration {
  pub email:            String,
  pub password:         String,
  pub confirm_password: String,
  pub name:             String,
  /// Preferred handle; one is generated when absent or taken.
  pub username:         Option<String>,
}

/// Profile edit form contents; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
  pub name:             Option<String>,
  pub username:         Option<String>,
  pub email:            Option<String>,
  pub password:         Option<String>,
  pub confirm_password: Option<String>,
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Owns the published [`SessionState`] and keeps it in step with the
/// backend's session-change stream for as long as the provider lives.
pub struct SessionProvider<B> {
  backend:  Arc<B>,
  gateway:  Gateway<B>,
  state:    Arc<watch::Sender<SessionState>>,
  listener: JoinHandle<()>,
}

impl<B> Drop for SessionProvider<B> {
  fn drop(&mut self) { self.listener.abort(); }
}

impl<B: Backend + 'static> SessionProvider<B> {
  /// Start listening for session changes. Must be called inside a tokio
  /// runtime.
  pub fn start(
    backend: Arc<B>,
    gateway: Gateway<B>,
    state: Arc<watch::Sender<SessionState>>,
  ) -> Self {
    state.send_replace(SessionState { identity: None, loading: true });

    let mut events = backend.subscribe_auth();
    let listener = tokio::spawn({
      let backend = Arc::clone(&backend);
      let state = Arc::clone(&state);
      async move {
        publish(&state, &*backend);
        loop {
          match events.recv().await {
            Ok(event) => {
              debug!(?event, "auth event");
              publish(&state, &*backend);
            }
            Err(RecvError::Lagged(missed)) => {
              warn!(missed, "auth events lagged; re-reading session");
              publish(&state, &*backend);
            }
            Err(RecvError::Closed) => break,
          }
        }
      }
    });

    Self { backend, gateway, state, listener }
  }

  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state.subscribe() }

  pub fn identity(&self) -> Option<Identity> { self.state.borrow().identity.clone() }

  pub fn is_authenticated(&self) -> bool { self.state.borrow().is_authenticated() }

  /// Wait until the initial session has been read.
  pub async fn ready(&self) -> SessionState {
    let mut rx = self.state.subscribe();
    match rx.wait_for(|s| !s.loading).await {
      Ok(state) => state.clone(),
      Err(_) => self.state(),
    }
  }

  fn set_identity(&self, identity: Option<Identity>) { settle(&self.state, identity); }

  // ── Actions ───────────────────────────────────────────────────────────

  pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
    validate::email(email)?;
    validate::password(password, None)?;

    let session = self
      .backend
      .sign_in(Credentials::new(email.trim(), password))
      .await
      .map_err(|e| AuthFailure::from_backend(&e))?;
    self.set_identity(Some(session.user.clone()));

    if let Err(err) = self.gateway.ensure_profile(None, None).await {
      warn!(error = %err, "signed in but profile sync failed");
    }
    info!(user_id = %session.user.user_id, "signed in");
    Ok(session.user)
  }

  pub async fn register(&self, form: Registration) -> Result<Identity, AuthFailure> {
    validate::non_empty("name", &form.name)?;
    validate::email(&form.email)?;
    validate::password(&form.password, Some(&form.confirm_password))?;
    let username = form
      .username
      .as_deref()
      .map(str::trim)
      .filter(|u| !u.is_empty());
    if let Some(username) = username {
      validate::username(username)?;
    }

    let session = self
      .backend
      .sign_up(Credentials::new(form.email.trim(), form.password.as_str()))
      .await
      .map_err(|e| AuthFailure::from_backend(&e))?;
    self.set_identity(Some(session.user.clone()));

    // The account exists either way; a missing profile is created on the
    // next sign-in.
    if let Err(err) = self.gateway.ensure_profile(Some(&form.name), username).await {
      warn!(error = %err, "registered but profile creation failed");
    }
    info!(user_id = %session.user.user_id, "registered");
    Ok(session.user)
  }

  /// Sign out. Local identity is cleared even when the backend call fails;
  /// in that case the remote session may remain valid.
  pub async fn logout(&self) {
    if let Err(err) = self.backend.sign_out().await {
      warn!(error = %err, "backend sign-out failed; clearing local session anyway");
    }
    self.set_identity(None);
    info!("signed out");
  }

  /// Apply profile edits. Email and password changes go through the auth
  /// API first, then the profile row is patched.
  pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, AuthFailure> {
    let Some(identity) = self.identity() else {
      return Err(AuthFailure::NotSignedIn);
    };
    if let Some(name) = &update.name {
      validate::non_empty("name", name)?;
    }
    if let Some(username) = &update.username {
      validate::username(username.trim())?;
    }
    if let Some(email) = &update.email {
      validate::email(email)?;
    }
    if let Some(password) = &update.password {
      validate::password(password, update.confirm_password.as_deref())?;
    }
    // Must run before `update_user`: a taken handle changes nothing.
    if let Some(username) = &update.username {
      let holder = self.gateway.try_profile_by_username(username).await?;
      if holder.is_some_and(|p| p.id != identity.user_id) {
        return Err(AuthFailure::UsernameTaken);
      }
    }

    let email = update
      .email
      .map(|e| e.trim().to_owned())
      .filter(|e| !e.eq_ignore_ascii_case(&identity.email));
    if email.is_some() || update.password.is_some() {
      let updated = self
        .backend
        .update_user(UserAttributes { email: email.clone(), password: update.password })
        .await
        .map_err(|e| AuthFailure::from_backend(&e))?;
      self.set_identity(Some(updated));
    }

    let profile = self
      .gateway
      .update_profile(ProfilePatch { username: update.username, name: update.name, email })
      .await?;
    Ok(profile)
  }

  /// Request a password-reset email. Unknown addresses are not reported.
  pub async fn reset_password(&self, email: &str) -> Result<(), AuthFailure> {
    validate::email(email)?;
    self
      .backend
      .reset_password_for_email(email.trim())
      .await
      .map_err(|e| AuthFailure::from_backend(&e))
  }
}

/// Re-derive identity from the backend's current session.
fn publish<B: Backend>(state: &watch::Sender<SessionState>, backend: &B) {
  settle(state, backend.current_session().map(|s| s.user));
}

/// Store `identity` and clear the loading flag, notifying only on change.
fn settle(state: &watch::Sender<SessionState>, identity: Option<Identity>) {
  state.send_if_modified(|s| {
    let changed = s.identity != identity || s.loading;
    s.identity = identity;
    s.loading = false;
    changed
  });
}
