//! Handler for `/tenants/{tenant_id}/calls/{call_id}`: archived call logs.

use axum::{
  Json,
  extract::{Path, State},
};
use switchboard_core::{session::CallLog, store::KeyValueStore};

use crate::{ApiState, error::ApiError};

/// `GET /tenants/{tenant_id}/calls/{call_id}` — 404 until the call has been
/// finalized.
pub async fn get_one<K: KeyValueStore>(
  State(state): State<ApiState<K>>,
  Path((tenant_id, call_id)): Path<(String, String)>,
) -> Result<Json<CallLog>, ApiError> {
  state
    .ledger
    .call_log(&tenant_id, &call_id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("call {call_id}")))
}
