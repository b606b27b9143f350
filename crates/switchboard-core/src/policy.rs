//! Budgets and expiry windows applied to every call.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Limits for a single call and the lifetimes of what it stores.
///
/// Deserialised from the `[policy]` table of the server configuration; any
/// field left out takes its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
  /// Lifetime of a live session record, refreshed on every save.
  pub session_ttl_secs:  u64,
  /// User/assistant exchanges allowed before the call is cut off.
  pub max_turns:         usize,
  /// Wall-clock budget for a call, measured from its start.
  pub max_duration_secs: u64,
  /// Lifetime of synthesized audio clips.
  pub audio_ttl_secs:    u64,
}

impl Default for SessionPolicy {
  fn default() -> Self {
    Self {
      session_ttl_secs:  3600,
      max_turns:         20,
      max_duration_secs: 900,
      audio_ttl_secs:    600,
    }
  }
}

impl SessionPolicy {
  pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_ttl_secs) }

  pub fn audio_ttl(&self) -> Duration { Duration::from_secs(self.audio_ttl_secs) }

  pub fn max_duration(&self) -> TimeDelta {
    i64::try_from(self.max_duration_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX)
  }
}
