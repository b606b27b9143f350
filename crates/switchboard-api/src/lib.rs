//! JSON admin API for Switchboard.
//!
//! Exposes an axum [`Router`] over any [`KeyValueStore`]: tenant settings,
//! archived call logs, and daily analytics counters. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", switchboard_api::api_router(kv.clone(), defaults))
//! ```

pub mod analytics;
pub mod calls;
pub mod error;
pub mod tenants;

use std::sync::Arc;

use axum::{Router, routing::get};
use switchboard_core::{
  analytics::AnalyticsLedger,
  store::KeyValueStore,
  tenant::{TenantConfig, TenantResolver},
};

pub use error::ApiError;

/// Shared handler state. Cloning is cheap.
pub struct ApiState<K> {
  pub tenants: TenantResolver<K>,
  pub ledger:  AnalyticsLedger<K>,
}

impl<K> Clone for ApiState<K> {
  fn clone(&self) -> Self {
    Self { tenants: self.tenants.clone(), ledger: self.ledger.clone() }
  }
}

/// Build a fully-materialised API router over `kv`.
///
/// `defaults` is the configuration reported for tenants that have none
/// stored. The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<K>(kv: Arc<K>, defaults: TenantConfig) -> Router<()>
where
  K: KeyValueStore + 'static,
{
  let state = ApiState {
    tenants: TenantResolver::new(Arc::clone(&kv), defaults),
    ledger:  AnalyticsLedger::new(kv),
  };

  Router::new()
    // Tenants
    .route(
      "/tenants/{tenant_id}/config",
      get(tenants::get_config::<K>).put(tenants::put_config::<K>),
    )
    // Call logs
    .route("/tenants/{tenant_id}/calls/{call_id}", get(calls::get_one::<K>))
    // Analytics
    .route("/tenants/{tenant_id}/analytics/{date}", get(analytics::daily::<K>))
    .with_state(state)
}
