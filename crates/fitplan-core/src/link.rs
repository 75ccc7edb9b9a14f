//! Profile-to-plan links (saves and likes).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which relationship a link row expresses.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkKind {
  Saved,
  Liked,
}

/// Result of inserting a link. At most one link exists per
/// (profile, plan, kind); a repeated insert is reported, not duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
  Created,
  AlreadyExists,
}
