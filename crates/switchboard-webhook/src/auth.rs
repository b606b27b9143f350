//! HTTP Basic-auth middleware and standalone verifier.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use switchboard_core::{
  provider::{LanguageModel, SpeechSynthesizer},
  store::KeyValueStore,
};
use tracing::debug;

use crate::{AppState, error::Error};

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Reject requests without valid credentials when auth is configured.
pub async fn require_auth<K, L, T>(
  State(state): State<AppState<K, L, T>>,
  req: Request,
  next: Next,
) -> Response
where
  K: KeyValueStore + 'static,
  L: LanguageModel + 'static,
  T: SpeechSynthesizer + 'static,
{
  if let Some(auth) = &state.auth
    && let Err(e) = verify_auth(req.headers(), auth)
  {
    debug!(path = %req.uri().path(), "rejected unauthenticated request");
    return e.into_response();
  }
  next.run(req).await
}
