//! ElevenLabs text-to-speech client.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use switchboard_core::provider::SpeechSynthesizer;

use crate::{Error, Result};

const PROVIDER: &str = "text-to-speech";

/// Connection settings for the text-to-speech endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
  pub base_url:     String,
  pub api_key:      String,
  pub voice_id:     String,
  pub model:        String,
  pub timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.elevenlabs.io".to_owned(),
      api_key:      String::new(),
      voice_id:     "21m00Tcm4TlvDq8ikWAM".to_owned(),
      model:        "eleven_turbo_v2".to_owned(),
      timeout_secs: 30,
    }
  }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
  text:     &'a str,
  model_id: &'a str,
}

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ElevenLabsVoice {
  client: Client,
  config: ElevenLabsConfig,
}

impl ElevenLabsVoice {
  pub fn new(config: ElevenLabsConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/v1/text-to-speech/{}",
      self.config.base_url.trim_end_matches('/'),
      self.config.voice_id
    )
  }
}

impl SpeechSynthesizer for ElevenLabsVoice {
  type Error = Error;

  async fn synthesize(&self, text: &str) -> Result<Bytes> {
    let body = SpeechRequest { text, model_id: &self.config.model };
    let resp = self
      .client
      .post(self.url())
      .header("xi-api-key", &self.config.api_key)
      .header(reqwest::header::ACCEPT, "audio/mpeg")
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::from_response(PROVIDER, resp).await);
    }

    let audio = resp.bytes().await?;
    if audio.is_empty() {
      return Err(Error::EmptyResponse(PROVIDER));
    }
    debug!(voice = %self.config.voice_id, bytes = audio.len(), "speech synthesized");
    Ok(audio)
  }
}
