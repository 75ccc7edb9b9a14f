//! Profile view model and username helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  /// Same as the auth user id.
  pub id:         Uuid,
  pub username:   String,
  pub name:       String,
  pub email:      String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Aggregate counts shown on a profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
  pub plan_count:        usize,
  pub public_plan_count: usize,
  /// Sum of the like counters across the profile's plans.
  pub likes_received:    u64,
}

/// Derive a username candidate from an email address: the local part,
/// lowercased, with anything outside `[a-z0-9_.]` dropped.
///
/// Falls back to `"user"` when nothing usable remains.
pub fn username_base(email: &str) -> String {
  let local = email.split('@').next().unwrap_or_default();
  let mut base: String = local
    .chars()
    .flat_map(char::to_lowercase)
    .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
    .take(24)
    .collect();
  if base.len() < 3 {
    base = format!("user{base}");
  }
  base
}

/// Display name derived from an email address, used when none is supplied.
pub fn default_display_name(email: &str) -> String {
  email.split('@').next().unwrap_or(email).to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn username_base_strips_and_lowercases() {
    assert_eq!(username_base("Jane.Doe+gym@example.com"), "jane.doegym");
  }

  #[test]
  fn username_base_pads_short_local_parts() {
    assert_eq!(username_base("a@example.com"), "usera");
    assert_eq!(username_base("@example.com"), "user");
  }

  #[test]
  fn display_name_is_local_part() {
    assert_eq!(default_display_name("lifter@example.com"), "lifter");
  }
}
