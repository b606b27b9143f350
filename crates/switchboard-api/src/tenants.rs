//! Handlers for `/tenants/{tenant_id}/config`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tenants/{tenant_id}/config` | Defaults if nothing is stored |
//! | `PUT`  | `/tenants/{tenant_id}/config` | Body: a full `TenantConfig` |

use axum::{
  Json,
  extract::{Path, State},
};
use switchboard_core::{store::KeyValueStore, tenant::TenantConfig};
use tracing::info;

use crate::{ApiState, error::ApiError};

/// `GET /tenants/{tenant_id}/config`
pub async fn get_config<K: KeyValueStore>(
  State(state): State<ApiState<K>>,
  Path(tenant_id): Path<String>,
) -> Json<TenantConfig> {
  Json(state.tenants.resolve(&tenant_id).await)
}

/// `PUT /tenants/{tenant_id}/config`
pub async fn put_config<K: KeyValueStore>(
  State(state): State<ApiState<K>>,
  Path(tenant_id): Path<String>,
  Json(config): Json<TenantConfig>,
) -> Result<Json<TenantConfig>, ApiError> {
  config
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  state.tenants.store(&tenant_id, &config).await?;
  info!(%tenant_id, business = %config.business_name, "tenant config updated");
  Ok(Json(config))
}
