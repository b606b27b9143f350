//! Call archive and per-tenant daily counters.
//!
//! Counters live in one hash per tenant per UTC day, e.g.
//! `{ "total_calls": 12, "resolved_AI": 3, "resolved_HUMAN": 9 }`.

use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;

use crate::{
  Error, Result,
  session::CallLog,
  store::{KeyValueStore, get_json, keys},
};

/// Counter incremented once for every finalized call.
pub const TOTAL_CALLS: &str = "total_calls";

pub struct AnalyticsLedger<K> {
  kv: Arc<K>,
}

impl<K> Clone for AnalyticsLedger<K> {
  fn clone(&self) -> Self { Self { kv: Arc::clone(&self.kv) } }
}

impl<K: KeyValueStore> AnalyticsLedger<K> {
  pub fn new(kv: Arc<K>) -> Self { Self { kv } }

  /// Store the archival record for a finished call, without expiry.
  pub async fn archive(&self, log: &CallLog) -> Result<()> {
    let key = keys::call_log(log.session.tenant_id(), log.session.call_id());
    let json = serde_json::to_string(log)?;
    self.kv.set(&key, json, None).await.map_err(Error::store)
  }

  pub async fn call_log(&self, tenant_id: &str, call_id: &str) -> Result<Option<CallLog>> {
    get_json(self.kv.as_ref(), &keys::call_log(tenant_id, call_id)).await
  }

  /// Bump one daily counter and return its new value.
  pub async fn increment(
    &self,
    tenant_id: &str,
    day:       NaiveDate,
    counter:   &str,
  ) -> Result<i64> {
    self
      .kv
      .increment(&keys::daily(tenant_id, day), counter, 1)
      .await
      .map_err(Error::store)
  }

  /// All counters for one tenant and day; empty if nothing was recorded.
  pub async fn daily(&self, tenant_id: &str, day: NaiveDate) -> Result<BTreeMap<String, i64>> {
    self
      .kv
      .counters(&keys::daily(tenant_id, day))
      .await
      .map_err(Error::store)
  }
}
