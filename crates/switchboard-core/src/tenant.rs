//! Tenant settings and their resolution.
//!
//! A tenant is identified by the number that was dialled. Tenants without a
//! stored configuration run on the default record; callers of
//! [`TenantResolver::resolve`] cannot tell the two cases apart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
  Error, Result,
  store::{KeyValueStore, get_json, keys},
};

/// Per-tenant call-handling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
  pub business_name:  String,
  pub business_hours: String,
  /// Where calls are transferred when the caller asks for a person.
  pub agent_address:  String,
  /// Tone the assistant is told to adopt, e.g. "friendly and professional".
  pub persona:        String,
  pub human_transfer: bool,
}

impl Default for TenantConfig {
  fn default() -> Self {
    Self {
      business_name:  "our office".to_owned(),
      business_hours: "9 AM to 5 PM, Monday through Friday".to_owned(),
      agent_address:  "+15555550100".to_owned(),
      persona:        "friendly and professional".to_owned(),
      human_transfer: true,
    }
  }
}

impl TenantConfig {
  /// The system turn that opens every session for this tenant.
  pub fn system_prompt(&self) -> String {
    format!(
      "You are a {persona} phone receptionist for {name}. Business hours are \
       {hours}. Answer in one or two short spoken sentences, without lists \
       or formatting. If you cannot help, offer to connect the caller to a \
       person.",
      persona = self.persona,
      name    = self.business_name,
      hours   = self.business_hours,
    )
  }

  /// Reject settings that would put a call through to nowhere.
  pub fn validate(&self) -> Result<()> {
    if self.human_transfer && self.agent_address.trim().is_empty() {
      return Err(Error::InvalidTenantConfig(
        "agent_address is required when human_transfer is enabled",
      ));
    }
    Ok(())
  }

  /// The line played when a call is first answered.
  pub fn greeting(&self) -> String {
    format!(
      "Thank you for calling {}. How can I help you today?",
      self.business_name
    )
  }
}

/// Looks up stored tenant settings, falling back to a default record.
///
/// Cloning is cheap.
pub struct TenantResolver<K> {
  kv:       Arc<K>,
  defaults: Arc<TenantConfig>,
}

impl<K> Clone for TenantResolver<K> {
  fn clone(&self) -> Self {
    Self { kv: Arc::clone(&self.kv), defaults: Arc::clone(&self.defaults) }
  }
}

impl<K: KeyValueStore> TenantResolver<K> {
  pub fn new(kv: Arc<K>, defaults: TenantConfig) -> Self {
    Self { kv, defaults: Arc::new(defaults) }
  }

  pub fn defaults(&self) -> &TenantConfig { &self.defaults }

  /// Settings for `tenant_id`. Never fails: a missing, unreadable, or
  /// malformed record yields the defaults.
  pub async fn resolve(&self, tenant_id: &str) -> TenantConfig {
    match self.stored(tenant_id).await {
      Ok(Some(config)) => config,
      Ok(None) => self.defaults.as_ref().clone(),
      Err(e) => {
        warn!(%tenant_id, error = %e, "tenant config unavailable, using defaults");
        self.defaults.as_ref().clone()
      }
    }
  }

  /// The stored record only, without the default fallback.
  pub async fn stored(&self, tenant_id: &str) -> Result<Option<TenantConfig>> {
    get_json(self.kv.as_ref(), &keys::tenant(tenant_id)).await
  }

  /// Persist settings for `tenant_id`, replacing any earlier record.
  pub async fn store(&self, tenant_id: &str, config: &TenantConfig) -> Result<()> {
    let json = serde_json::to_string(config)?;
    self
      .kv
      .set(&keys::tenant(tenant_id), json, None)
      .await
      .map_err(Error::store)
  }
}
