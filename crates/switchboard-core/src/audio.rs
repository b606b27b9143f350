//! Short-lived storage for synthesized audio clips.
//!
//! The telephony provider fetches clips by URL, so each one is parked in the
//! key-value store (base64-encoded) under a random id until it expires.

use std::{fmt, sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{KeyValueStore, keys},
};

/// Opaque handle to a stored clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AudioRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

pub struct AudioStore<K> {
  kv:  Arc<K>,
  ttl: Duration,
}

impl<K> Clone for AudioStore<K> {
  fn clone(&self) -> Self { Self { kv: Arc::clone(&self.kv), ttl: self.ttl } }
}

impl<K: KeyValueStore> AudioStore<K> {
  pub fn new(kv: Arc<K>, ttl: Duration) -> Self { Self { kv, ttl } }

  /// How long a clip stays fetchable after [`put`](Self::put).
  pub fn ttl(&self) -> Duration { self.ttl }

  pub async fn put(&self, audio: &[u8]) -> Result<AudioRef> {
    let id = AudioRef(Uuid::new_v4().simple().to_string());
    self
      .kv
      .set(&keys::audio(id.as_str()), B64.encode(audio), Some(self.ttl))
      .await
      .map_err(Error::store)?;
    Ok(id)
  }

  /// Fetch a clip; `None` once it has expired.
  pub async fn get(&self, id: &str) -> Result<Option<Bytes>> {
    let Some(encoded) = self.kv.get(&keys::audio(id)).await.map_err(Error::store)? else {
      return Ok(None);
    };
    Ok(Some(Bytes::from(B64.decode(encoded)?)))
  }
}
