//! Client configuration, deserialised from a TOML file and `FITPLAN_*`
//! environment variables by the binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::collections::{FetchErrorPolicy, StoreOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// SQLite database file. A leading `~/` is expanded by the binary.
  pub store_path:     PathBuf,
  pub on_fetch_error: FetchErrorPolicy,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("~/.local/share/fitplan/fitplan.db"),
      on_fetch_error: FetchErrorPolicy::default(),
    }
  }
}

impl ClientConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { on_fetch_error: self.on_fetch_error }
  }
}
