//! `POST /voice/status` — call progress callbacks.
//!
//! Only terminal statuses finalize the call; progress updates such as
//! `ringing` or `in-progress` are acknowledged and ignored. A callback
//! without a status is treated as the end of the call. The provider is
//! always acknowledged, even when finalization fails.

use axum::extract::{Form, State, rejection::FormRejection};
use chrono::Utc;
use switchboard_core::{
  NextAction,
  provider::{LanguageModel, SpeechSynthesizer},
  store::KeyValueStore,
};
use tracing::{debug, error};

use crate::{AppState, error::Error, handlers::CallEvent, twiml::Twiml};

/// Provider statuses after which the call cannot continue.
pub const TERMINAL_STATUSES: [&str; 5] =
  ["completed", "busy", "failed", "no-answer", "canceled"];

pub fn is_terminal(status: Option<&str>) -> bool {
  status.is_none_or(|s| TERMINAL_STATUSES.contains(&s))
}

pub async fn handler<K, L, T>(
  State(state): State<AppState<K, L, T>>,
  form: Result<Form<CallEvent>, FormRejection>,
) -> Result<Twiml, Error>
where
  K: KeyValueStore + 'static,
  L: LanguageModel + 'static,
  T: SpeechSynthesizer + 'static,
{
  if let Some(event) = CallEvent::accept(form) {
    if is_terminal(event.call_status.as_deref()) {
      if let Err(e) = state
        .board
        .end_call(&event.to, &event.call_sid, Utc::now())
        .await
      {
        error!(call_sid = %event.call_sid, error = %e, "failed to finalize call");
      }
    } else {
      debug!(call_sid = %event.call_sid, status = ?event.call_status, "call progress");
    }
  }
  state.render(&NextAction::AckOnly)
}
