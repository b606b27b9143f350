//! `POST /voice` — an inbound call was answered.

use axum::extract::{Form, State, rejection::FormRejection};
use chrono::Utc;
use switchboard_core::{
  NextAction,
  provider::{LanguageModel, SpeechSynthesizer},
  store::KeyValueStore,
};

use crate::{
  AppState,
  error::Error,
  handlers::{CallEvent, recover},
  twiml::Twiml,
};

pub async fn handler<K, L, T>(
  State(state): State<AppState<K, L, T>>,
  form: Result<Form<CallEvent>, FormRejection>,
) -> Result<Twiml, Error>
where
  K: KeyValueStore + 'static,
  L: LanguageModel + 'static,
  T: SpeechSynthesizer + 'static,
{
  let Some(event) = CallEvent::accept(form) else {
    return state.render(&NextAction::AckOnly);
  };
  let result = state
    .board
    .start_call(&event.to, &event.call_sid, &event.from, Utc::now())
    .await;
  state.render(&recover(result, &event.call_sid))
}
