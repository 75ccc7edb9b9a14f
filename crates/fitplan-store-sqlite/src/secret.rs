//! Password hashing and session-token generation.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::{OsRng, RngCore as _};

use crate::{Error, Result};

/// Hash a password into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// `true` if `password` matches the stored PHC string. A malformed stored
/// hash counts as a mismatch.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// 32 random bytes, hex-encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let phc = hash_password("hunter22").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("hunter22", &phc));
    assert!(!verify_password("hunter23", &phc));
  }

  #[test]
  fn malformed_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_hex() {
    let (a, b) = (new_token(), new_token());
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }
}
