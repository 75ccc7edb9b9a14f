//! Error type for `fitplan-store-sqlite`.

use fitplan_core::store::{BackendError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("timestamp parse error: {0}")]
  Timestamp(#[from] chrono::ParseError),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("username already taken: {0}")]
  UsernameTaken(String),

  #[error("not signed in")]
  NotSignedIn,

  /// The referenced row does not exist or is not visible to the caller.
  #[error("{table} row not found: {id}")]
  NotFound { table: &'static str, id: uuid::Uuid },
}

impl BackendError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidCredentials => ErrorKind::InvalidCredentials,
      Error::EmailTaken(_) => ErrorKind::EmailTaken,
      Error::UsernameTaken(_) => ErrorKind::UsernameTaken,
      Error::NotSignedIn => ErrorKind::Unauthenticated,
      Error::NotFound { .. } => ErrorKind::NotFound,
      Error::Database(tokio_rusqlite::Error::Rusqlite(e))
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) =>
      {
        ErrorKind::Duplicate
      }
      Error::Database(_)
      | Error::Uuid(_)
      | Error::Timestamp(_)
      | Error::PasswordHash(_) => ErrorKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
