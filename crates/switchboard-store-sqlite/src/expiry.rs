//! Conversions between TTLs and the epoch-millisecond `expires_at` column.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub fn now_millis() -> i64 { Utc::now().timestamp_millis() }

/// Absolute expiry for a value written at `now` with `ttl`, saturating
/// instead of overflowing for absurdly long TTLs.
pub fn expires_at(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<i64> {
  let ttl = ttl?;
  let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
  Some(now.timestamp_millis().saturating_add(ttl_ms))
}
