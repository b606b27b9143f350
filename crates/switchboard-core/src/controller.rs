//! The conversation turn controller.
//!
//! [`TurnController::advance`] moves a session forward by exactly one speech
//! event. The checks run in a fixed order: closed-session replay, turn
//! budget, time budget, human transfer, then intent classification and reply
//! generation. Nothing is persisted until the step has decided its outcome,
//! so a failed model call leaves the stored session exactly as it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
  Error, NextAction, Result,
  action::{GOODBYE_MESSAGE, MAX_LENGTH_MESSAGE, RETRY_MESSAGE, TIMED_OUT_MESSAGE},
  audio::{AudioRef, AudioStore},
  policy::SessionPolicy,
  provider::{LanguageModel, SpeechSynthesizer},
  session::{CallSession, Intent, ResolvedBy, Turn},
  store::{KeyValueStore, SessionStore},
  tenant::TenantConfig,
};

/// Words that route a caller to a person, matched as lowercase substrings.
pub const TRANSFER_KEYWORDS: [&str; 4] = ["human", "agent", "person", "operator"];

const CLASSIFIER_PROMPT: &str = "Classify the caller's intent from their \
  message. Reply with exactly one word: sales, support, info, or unknown.";

/// Whether an utterance asks for a human.
pub fn wants_human(utterance: &str) -> bool {
  let lowered = utterance.to_lowercase();
  TRANSFER_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// The action that ends (or re-ends) a call with the given outcome.
pub fn closing_action(outcome: ResolvedBy, config: &TenantConfig) -> NextAction {
  match outcome {
    ResolvedBy::Human => NextAction::TransferToHuman(config.agent_address.clone()),
    ResolvedBy::Limit => NextAction::SayAndEnd(MAX_LENGTH_MESSAGE.to_owned()),
    ResolvedBy::TimeLimit => NextAction::SayAndEnd(TIMED_OUT_MESSAGE.to_owned()),
    ResolvedBy::Ai | ResolvedBy::Unset => {
      NextAction::SayAndEnd(GOODBYE_MESSAGE.to_owned())
    }
  }
}

pub struct TurnController<K, L, T> {
  sessions: SessionStore<K>,
  audio:    AudioStore<K>,
  model:    Arc<L>,
  voice:    Arc<T>,
  policy:   SessionPolicy,
}

impl<K, L, T> TurnController<K, L, T>
where
  K: KeyValueStore,
  L: LanguageModel,
  T: SpeechSynthesizer,
{
  pub fn new(
    sessions: SessionStore<K>,
    audio:    AudioStore<K>,
    model:    Arc<L>,
    voice:    Arc<T>,
    policy:   SessionPolicy,
  ) -> Self {
    Self { sessions, audio, model, voice, policy }
  }

  /// Apply one speech event to the session `(tenant_id, call_id)`.
  ///
  /// An unknown session yields [`NextAction::AckOnly`]. Errors are store
  /// failures only; model and synthesis failures degrade to a spoken
  /// fallback instead.
  pub async fn advance(
    &self,
    config:    &TenantConfig,
    tenant_id: &str,
    call_id:   &str,
    utterance: &str,
    now:       DateTime<Utc>,
  ) -> Result<NextAction> {
    let Some(mut session) = self.sessions.get(tenant_id, call_id).await? else {
      debug!(%tenant_id, %call_id, "speech for unknown session ignored");
      return Ok(NextAction::AckOnly);
    };

    if session.is_closed() {
      debug!(
        %tenant_id, %call_id, outcome = %session.resolved_by(),
        "speech for resolved session; repeating closing action"
      );
      return Ok(closing_action(session.resolved_by(), config));
    }

    if session.completed_pairs() >= self.policy.max_turns {
      return self.close(session, ResolvedBy::Limit, config).await;
    }

    if session.elapsed(now) > self.policy.max_duration() {
      return self.close(session, ResolvedBy::TimeLimit, config).await;
    }

    session.push_user(utterance)?;

    if config.human_transfer && wants_human(utterance) {
      return self.close(session, ResolvedBy::Human, config).await;
    }

    if session.intent().is_none() {
      match self.classify(utterance).await {
        Ok(intent) => {
          session.set_intent(intent);
          info!(%tenant_id, %call_id, %intent, "intent classified");
        }
        Err(e) => {
          warn!(%tenant_id, %call_id, error = %e, "intent classification failed");
        }
      }
    }

    let reply = match self.reply(&session).await {
      Ok(reply) => reply,
      Err(e) => {
        warn!(
          %tenant_id, %call_id, error = %e,
          "reply generation failed; session left unchanged"
        );
        return Ok(NextAction::SayThenGather(RETRY_MESSAGE.to_owned()));
      }
    };

    session.push_assistant(reply.as_str())?;
    self.sessions.save(&session).await?;
    debug!(%tenant_id, %call_id, pairs = session.completed_pairs(), "turn completed");

    Ok(self.speak(&reply).await)
  }

  /// Synthesize `text` and return an action that plays it, falling back to
  /// the telephony provider's own voice if synthesis or storage fails.
  pub async fn speak(&self, text: &str) -> NextAction {
    match self.render(text).await {
      Ok(audio) => NextAction::PlayThenGather(audio),
      Err(e) => {
        warn!(error = %e, "speech synthesis failed; using provider voice");
        NextAction::SayThenGather(text.to_owned())
      }
    }
  }

  async fn close(
    &self,
    mut session: CallSession,
    outcome:     ResolvedBy,
    config:      &TenantConfig,
  ) -> Result<NextAction> {
    session.resolve(outcome)?;
    self.sessions.save(&session).await?;
    info!(
      tenant_id = session.tenant_id(), call_id = session.call_id(), %outcome,
      "call resolved"
    );
    Ok(closing_action(outcome, config))
  }

  async fn classify(&self, utterance: &str) -> Result<Intent> {
    let messages = [Turn::system(CLASSIFIER_PROMPT), Turn::user(utterance)];
    let label = self
      .model
      .complete(&messages)
      .await
      .map_err(|e| Error::LanguageModel(Box::new(e)))?;
    Ok(Intent::from_label(&label))
  }

  async fn reply(&self, session: &CallSession) -> Result<String> {
    let reply = self
      .model
      .complete(session.turns())
      .await
      .map_err(|e| Error::LanguageModel(Box::new(e)))?;
    let reply = reply.trim();
    if reply.is_empty() {
      return Err(Error::LanguageModel("model returned an empty reply".into()));
    }
    Ok(reply.to_owned())
  }

  async fn render(&self, text: &str) -> Result<AudioRef> {
    let audio = self
      .voice
      .synthesize(text)
      .await
      .map_err(|e| Error::Synthesis(Box::new(e)))?;
    self.audio.put(&audio).await
  }
}
