//! Error types for `switchboard-core`.

use thiserror::Error;

use crate::session::ResolvedBy;

/// A boxed collaborator error (store, model, or synthesizer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("language model error: {0}")]
  LanguageModel(#[source] BoxError),

  #[error("speech synthesis error: {0}")]
  Synthesis(#[source] BoxError),

  /// A stored record did not decode into its typed schema.
  #[error("malformed record at {key:?}: {source}")]
  MalformedRecord {
    key:    String,
    #[source]
    source: serde_json::Error,
  },

  #[error("call {call_id} is already resolved as {outcome}")]
  AlreadyResolved {
    call_id: String,
    outcome: ResolvedBy,
  },

  #[error("invalid tenant config: {0}")]
  InvalidTenantConfig(&'static str),

  #[error("{0} is not a terminal outcome")]
  NotTerminal(ResolvedBy),

  #[error("audio payload is not valid base64: {0}")]
  AudioEncoding(#[from] base64::DecodeError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
