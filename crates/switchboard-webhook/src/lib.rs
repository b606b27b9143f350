//! Telephony webhook server for Switchboard.
//!
//! Exposes an axum [`Router`] that turns the provider's call webhooks into
//! [`Switchboard`] operations and answers with TwiML, plus the JSON admin
//! API from `switchboard-api` under `/api`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod twiml;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use serde::Deserialize;
use switchboard_core::{
  NextAction, Switchboard,
  policy::SessionPolicy,
  provider::{LanguageModel, SpeechSynthesizer},
  store::KeyValueStore,
  tenant::TenantConfig,
};
use switchboard_providers::{ElevenLabsConfig, OpenAiConfig};
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use twiml::{Twiml, Urls};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SWITCHBOARD_*` environment variables.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  /// Public URL the telephony provider reaches this server at.
  pub base_url:            String,
  pub store_path:          PathBuf,
  pub auth_username:       Option<String>,
  pub auth_password_hash:  Option<String>,
  /// How often expired store entries are physically removed.
  pub purge_interval_secs: u64,
  pub policy:              SessionPolicy,
  /// Settings for tenants that have none stored.
  pub tenant_defaults:     TenantConfig,
  pub llm:                 OpenAiConfig,
  pub tts:                 ElevenLabsConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_owned(),
      port:                8080,
      base_url:            "http://localhost:8080".to_owned(),
      store_path:          PathBuf::from("switchboard.db"),
      auth_username:       None,
      auth_password_hash:  None,
      purge_interval_secs: 300,
      policy:              SessionPolicy::default(),
      tenant_defaults:     TenantConfig::default(),
      llm:                 OpenAiConfig::default(),
      tts:                 ElevenLabsConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Basic-auth credentials, if both halves are configured.
  pub fn auth(&self) -> Option<AuthConfig> {
    match (&self.auth_username, &self.auth_password_hash) {
      (Some(username), Some(password_hash)) => Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      }),
      _ => None,
    }
  }

  /// Startup checks the deserialiser cannot express.
  pub fn validate(&self) -> anyhow::Result<()> {
    if self.auth().is_none()
      && (self.auth_username.is_some() || self.auth_password_hash.is_some())
    {
      anyhow::bail!("auth_username and auth_password_hash must be set together");
    }
    if let Err(e) = self.tenant_defaults.validate() {
      anyhow::bail!("[tenant_defaults]: {e}");
    }
    Ok(())
  }

  pub fn purge_interval(&self) -> Duration {
    Duration::from_secs(self.purge_interval_secs.max(1))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<K, L, T> {
  pub board: Arc<Switchboard<K, L, T>>,
  pub kv:    Arc<K>,
  pub urls:  Arc<Urls>,
  pub auth:  Option<Arc<AuthConfig>>,
}

impl<K, L, T> Clone for AppState<K, L, T> {
  fn clone(&self) -> Self {
    Self {
      board: Arc::clone(&self.board),
      kv:    Arc::clone(&self.kv),
      urls:  Arc::clone(&self.urls),
      auth:  self.auth.clone(),
    }
  }
}

impl<K, L, T> AppState<K, L, T>
where
  K: KeyValueStore,
  L: LanguageModel,
  T: SpeechSynthesizer,
{
  pub fn new(kv: Arc<K>, model: Arc<L>, voice: Arc<T>, config: &ServerConfig) -> Self {
    let board = Switchboard::new(
      Arc::clone(&kv),
      model,
      voice,
      config.policy,
      config.tenant_defaults.clone(),
    );
    Self {
      board: Arc::new(board),
      kv,
      urls: Arc::new(Urls::new(&config.base_url)),
      auth: config.auth().map(Arc::new),
    }
  }

  pub fn render(&self, action: &NextAction) -> Result<Twiml, Error> {
    Ok(twiml::render(action, &self.urls)?)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
///
/// `/health` and `/audio/{id}` are always public; everything else requires
/// basic auth when credentials are configured.
pub fn router<K, L, T>(state: AppState<K, L, T>) -> Router
where
  K: KeyValueStore + 'static,
  L: LanguageModel + 'static,
  T: SpeechSynthesizer + 'static,
{
  let api = switchboard_api::api_router(
    Arc::clone(&state.kv),
    state.board.tenants().defaults().clone(),
  );

  let protected = Router::new()
    .route("/voice",        post(handlers::voice::handler::<K, L, T>))
    .route("/voice/speech", post(handlers::speech::handler::<K, L, T>))
    .route("/voice/status", post(handlers::status::handler::<K, L, T>))
    .nest_service("/api", api)
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      auth::require_auth::<K, L, T>,
    ));

  Router::new()
    .route("/health",     get(health))
    .route("/audio/{id}", get(handlers::audio::handler::<K, L, T>))
    .merge(protected)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "ok" }
