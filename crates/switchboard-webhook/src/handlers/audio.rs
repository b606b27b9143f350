//! `GET /audio/{id}` — synthesized clips for the provider to play.

use std::time::Duration;

use axum::{
  extract::{Path, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use switchboard_core::{
  provider::{LanguageModel, SpeechSynthesizer},
  store::KeyValueStore,
};
use tracing::error;

use crate::{AppState, error::Error};

pub async fn handler<K, L, T>(
  State(state): State<AppState<K, L, T>>,
  Path(id): Path<String>,
) -> Response
where
  K: KeyValueStore + 'static,
  L: LanguageModel + 'static,
  T: SpeechSynthesizer + 'static,
{
  let audio = state.board.audio();
  match audio.get(&id).await {
    Ok(Some(clip)) => (
      [
        (header::CONTENT_TYPE, state.board.audio_content_type().to_owned()),
        (header::CACHE_CONTROL, cache_control(audio.ttl())),
      ],
      clip,
    )
      .into_response(),
    Ok(None) => Error::NotFound.into_response(),
    Err(e) => {
      error!(%id, error = %e, "failed to load audio clip");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}

/// Clips must not outlive their store entry in the provider's cache.
fn cache_control(ttl: Duration) -> String {
  format!("private, max-age={}", ttl.as_secs())
}
