//! The `KeyValueStore` trait and the typed [`SessionStore`] built on it.
//!
//! The trait is implemented by storage backends (e.g.
//! `switchboard-store-sqlite`). Everything above it (sessions, tenants,
//! analytics, audio) is expressed in terms of its five primitives, so any
//! store with per-key atomic get/set/delete and atomic counter increments can
//! back a deployment.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Error, Result,
  session::CallSession,
  tenant::TenantConfig,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the shared key-value store.
///
/// Every operation is atomic for the single key (or counter field) it
/// touches; no multi-key transactions are assumed. Concurrent writers to the
/// same key resolve as last-write-wins.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a value. Expired entries read as `None`.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Insert or overwrite a value. `ttl = None` stores it without expiry.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
    ttl: Option<Duration>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a value. Returns whether anything was removed.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Atomically add `by` to `field` of the counter hash at `key`, creating
  /// it at zero first if needed. Returns the new value.
  fn increment<'a>(
    &'a self,
    key: &'a str,
    field: &'a str,
    by: i64,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// All fields of the counter hash at `key`; empty if it does not exist.
  fn counters<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<BTreeMap<String, i64>, Self::Error>> + Send + 'a;
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Key layout. Components are escaped so that distinct `(tenant, id)` pairs
/// can never produce the same key.
pub mod keys {
  use chrono::NaiveDate;

  fn escape(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
  }

  pub fn session(tenant_id: &str, call_id: &str) -> String {
    format!("session:{}:{}", escape(tenant_id), escape(call_id))
  }

  pub fn call_log(tenant_id: &str, call_id: &str) -> String {
    format!("calllog:{}:{}", escape(tenant_id), escape(call_id))
  }

  pub fn tenant(tenant_id: &str) -> String {
    format!("tenant:{}", escape(tenant_id))
  }

  pub fn daily(tenant_id: &str, day: NaiveDate) -> String {
    format!("analytics:{}:{}", escape(tenant_id), day.format("%Y-%m-%d"))
  }

  pub fn audio(id: &str) -> String { format!("audio:{}", escape(id)) }
}

/// Read and decode a JSON record, mapping decode failures to
/// [`Error::MalformedRecord`].
pub(crate) async fn get_json<K, T>(kv: &K, key: &str) -> Result<Option<T>>
where
  K: KeyValueStore,
  T: serde::de::DeserializeOwned,
{
  let Some(raw) = kv.get(key).await.map_err(Error::store)? else {
    return Ok(None);
  };
  serde_json::from_str(&raw)
    .map(Some)
    .map_err(|source| Error::MalformedRecord { key: key.to_owned(), source })
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Typed access to live [`CallSession`] records.
///
/// Every write is a whole-record overwrite that refreshes the TTL, so
/// retried webhooks converge on the last write rather than corrupting the
/// record. Cloning is cheap.
pub struct SessionStore<K> {
  kv:  Arc<K>,
  ttl: Duration,
}

impl<K> Clone for SessionStore<K> {
  fn clone(&self) -> Self { Self { kv: Arc::clone(&self.kv), ttl: self.ttl } }
}

impl<K: KeyValueStore> SessionStore<K> {
  pub fn new(kv: Arc<K>, ttl: Duration) -> Self { Self { kv, ttl } }

  /// Build and persist a fresh session seeded from the tenant's prompt.
  ///
  /// A duplicate create for the same key replaces the earlier record.
  pub async fn create(
    &self,
    tenant_id: &str,
    call_id:   &str,
    caller:    &str,
    config:    &TenantConfig,
    now:       DateTime<Utc>,
  ) -> Result<CallSession> {
    let session =
      CallSession::new(tenant_id, call_id, caller, config.system_prompt(), now);
    self.save(&session).await?;
    Ok(session)
  }

  /// Load a session. `None` means unknown, expired, or already finalized.
  pub async fn get(&self, tenant_id: &str, call_id: &str) -> Result<Option<CallSession>> {
    get_json(self.kv.as_ref(), &keys::session(tenant_id, call_id)).await
  }

  /// Overwrite the stored session and refresh its TTL.
  pub async fn save(&self, session: &CallSession) -> Result<()> {
    let key  = keys::session(session.tenant_id(), session.call_id());
    let json = serde_json::to_string(session)?;
    self
      .kv
      .set(&key, json, Some(self.ttl))
      .await
      .map_err(Error::store)?;
    debug!(%key, turns = session.turns().len(), "session saved");
    Ok(())
  }

  /// Remove the live record. Deleting a missing session is not an error.
  pub async fn delete(&self, tenant_id: &str, call_id: &str) -> Result<()> {
    self
      .kv
      .delete(&keys::session(tenant_id, call_id))
      .await
      .map_err(Error::store)?;
    Ok(())
  }
}
