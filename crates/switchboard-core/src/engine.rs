//! [`Switchboard`] — one handle over every call-lifecycle operation.
//!
//! Built once at process start from shared collaborator handles and never
//! mutated afterwards. Each method is one stateless webhook step: all
//! continuity lives in the key-value store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
  NextAction, Result,
  analytics::AnalyticsLedger,
  audio::AudioStore,
  controller::TurnController,
  finalizer::{FinalizeReport, Finalizer},
  policy::SessionPolicy,
  provider::{LanguageModel, SpeechSynthesizer},
  store::{KeyValueStore, SessionStore},
  tenant::{TenantConfig, TenantResolver},
};

pub struct Switchboard<K, L, T> {
  tenants:    TenantResolver<K>,
  sessions:   SessionStore<K>,
  audio:      AudioStore<K>,
  ledger:     AnalyticsLedger<K>,
  controller: TurnController<K, L, T>,
  finalizer:  Finalizer<K>,
  voice:      Arc<T>,
}

impl<K, L, T> Switchboard<K, L, T>
where
  K: KeyValueStore,
  L: LanguageModel,
  T: SpeechSynthesizer,
{
  pub fn new(
    kv:       Arc<K>,
    model:    Arc<L>,
    voice:    Arc<T>,
    policy:   SessionPolicy,
    defaults: TenantConfig,
  ) -> Self {
    let tenants  = TenantResolver::new(Arc::clone(&kv), defaults);
    let sessions = SessionStore::new(Arc::clone(&kv), policy.session_ttl());
    let audio    = AudioStore::new(Arc::clone(&kv), policy.audio_ttl());
    let ledger   = AnalyticsLedger::new(kv);
    let controller = TurnController::new(
      sessions.clone(),
      audio.clone(),
      model,
      Arc::clone(&voice),
      policy,
    );
    let finalizer = Finalizer::new(sessions.clone(), ledger.clone());

    Self { tenants, sessions, audio, ledger, controller, finalizer, voice }
  }

  /// Inbound call: open a session for the dialled tenant and greet the
  /// caller. A retried initiation replaces the earlier session.
  pub async fn start_call(
    &self,
    tenant_id: &str,
    call_id:   &str,
    caller:    &str,
    now:       DateTime<Utc>,
  ) -> Result<NextAction> {
    let config = self.tenants.resolve(tenant_id).await;
    self
      .sessions
      .create(tenant_id, call_id, caller, &config, now)
      .await?;
    info!(%tenant_id, %call_id, %caller, "call started");
    Ok(self.controller.speak(&config.greeting()).await)
  }

  /// Speech result: advance the call by one turn.
  pub async fn handle_speech(
    &self,
    tenant_id: &str,
    call_id:   &str,
    utterance: &str,
    now:       DateTime<Utc>,
  ) -> Result<NextAction> {
    let config = self.tenants.resolve(tenant_id).await;
    self
      .controller
      .advance(&config, tenant_id, call_id, utterance, now)
      .await
  }

  /// Call ended: archive and count it. `None` if it was already finalized
  /// or never known.
  pub async fn end_call(
    &self,
    tenant_id: &str,
    call_id:   &str,
    now:       DateTime<Utc>,
  ) -> Result<Option<FinalizeReport>> {
    self.finalizer.finalize(tenant_id, call_id, now).await
  }

  pub fn tenants(&self) -> &TenantResolver<K> { &self.tenants }

  pub fn sessions(&self) -> &SessionStore<K> { &self.sessions }

  pub fn audio(&self) -> &AudioStore<K> { &self.audio }

  pub fn ledger(&self) -> &AnalyticsLedger<K> { &self.ledger }

  /// MIME type of the clips referenced by [`NextAction::PlayThenGather`].
  pub fn audio_content_type(&self) -> &'static str { self.voice.content_type() }
}
