//! Handler for `/tenants/{tenant_id}/analytics/{date}`.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use switchboard_core::store::KeyValueStore;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct DailyReport {
  pub tenant_id: String,
  pub date:      NaiveDate,
  pub counters:  BTreeMap<String, i64>,
}

/// `GET /tenants/{tenant_id}/analytics/{date}` — `date` is `YYYY-MM-DD`
/// (UTC). Days without calls report an empty counter map.
pub async fn daily<K: KeyValueStore>(
  State(state): State<ApiState<K>>,
  Path((tenant_id, date)): Path<(String, String)>,
) -> Result<Json<DailyReport>, ApiError> {
  let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
    .map_err(|e| ApiError::BadRequest(format!("invalid date {date:?}: {e}")))?;
  let counters = state.ledger.daily(&tenant_id, date).await?;
  Ok(Json(DailyReport { tenant_id, date, counters }))
}
