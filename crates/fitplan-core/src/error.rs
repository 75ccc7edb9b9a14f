//! Error types for `fitplan-core`.

use thiserror::Error;

/// Input rejected on the client before any backend call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  #[error("weight must be a positive number, got {0}")]
  InvalidWeight(f64),

  #[error("set count must be at least 1")]
  InvalidSets,

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("password must be at least {min} characters")]
  PasswordTooShort { min: usize },

  #[error("passwords do not match")]
  PasswordMismatch,

  #[error("invalid username {0:?}: use 3-30 letters, digits, '_' or '.'")]
  InvalidUsername(String),

  #[error("ordering index {0} is used by more than one day")]
  DuplicatePosition(u32),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("not signed in")]
  NotAuthenticated,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
