//! Client-side validation, run before any backend call.

use std::collections::HashSet;

use crate::{
  error::ValidationError,
  plan::{NewDay, NewPlan, positioned},
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_USERNAME_LEN: usize = 30;

type Result<T> = std::result::Result<T, ValidationError>;

/// Weights must be finite and strictly positive.
pub fn weight(value: f64) -> Result<f64> {
  if value.is_finite() && value > 0.0 {
    Ok(value)
  } else {
    Err(ValidationError::InvalidWeight(value))
  }
}

/// Parse a user-entered weight, accepting a comma as decimal separator.
pub fn parse_weight(input: &str) -> Result<f64> {
  let normalised = input.trim().replace(',', ".");
  let value = normalised
    .parse::<f64>()
    .map_err(|_| ValidationError::InvalidWeight(f64::NAN))?;
  weight(value)
}

pub fn non_empty(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(ValidationError::EmptyField(field));
  }
  Ok(())
}

/// A deliberately loose shape check: one `@` with text on both sides and a dot
/// in the domain. The backend remains the authority.
pub fn email(value: &str) -> Result<()> {
  let trimmed = value.trim();
  let valid = match trimmed.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !trimmed.contains(char::is_whitespace)
    }
    None => false,
  };
  if valid { Ok(()) } else { Err(ValidationError::InvalidEmail(value.to_owned())) }
}

/// Check password length and, when a confirmation is given, that it matches.
pub fn password(value: &str, confirmation: Option<&str>) -> Result<()> {
  if value.chars().count() < MIN_PASSWORD_LEN {
    return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN });
  }
  if let Some(confirm) = confirmation
    && confirm != value
  {
    return Err(ValidationError::PasswordMismatch);
  }
  Ok(())
}

pub fn username(value: &str) -> Result<()> {
  let len = value.chars().count();
  let charset_ok = value
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
  if (3..=MAX_USERNAME_LEN).contains(&len) && charset_ok {
    Ok(())
  } else {
    Err(ValidationError::InvalidUsername(value.to_owned()))
  }
}

/// Validate a plan tree: a name, named exercises with at least one set, and
/// day ordering indexes that are unique within the plan.
pub fn new_plan(plan: &NewPlan) -> Result<()> {
  non_empty("plan name", &plan.name)?;
  days(&plan.days)
}

/// Validate a day tree on its own, as submitted by a full resave.
pub fn days(days: &[NewDay]) -> Result<()> {
  let mut seen = HashSet::new();
  for (position, day) in positioned(days) {
    if !seen.insert(position) {
      return Err(ValidationError::DuplicatePosition(position));
    }
    non_empty("weekday", &day.weekday)?;
    for exercise in &day.exercises {
      non_empty("exercise name", &exercise.name)?;
      if exercise.sets == 0 {
        return Err(ValidationError::InvalidSets);
      }
    }
  }
  Ok(())
}
