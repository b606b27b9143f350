//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use switchboard_core::{provider::LanguageModel, session::Turn};

use crate::{Error, Result};

const PROVIDER: &str = "chat completions";

/// Connection settings for the chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
  /// API root, e.g. `https://api.openai.com/v1`.
  pub base_url:     String,
  pub api_key:      String,
  pub model:        String,
  pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.openai.com/v1".to_owned(),
      api_key:      String::new(),
      model:        "gpt-4o-mini".to_owned(),
      timeout_secs: 30,
    }
  }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:    &'a str,
  messages: &'a [Turn],
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenAiChat {
  client: Client,
  config: OpenAiConfig,
}

impl OpenAiChat {
  pub fn new(config: OpenAiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }
}

impl LanguageModel for OpenAiChat {
  type Error = Error;

  async fn complete(&self, messages: &[Turn]) -> Result<String> {
    let body = ChatRequest { model: &self.config.model, messages };
    let resp = self
      .client
      .post(self.url())
      .bearer_auth(&self.config.api_key)
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::from_response(PROVIDER, resp).await);
    }

    let parsed: ChatResponse = resp.json().await?;
    let content = parsed
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or(Error::EmptyResponse(PROVIDER))?;
    debug!(model = %self.config.model, messages = messages.len(), "completion received");
    Ok(content)
  }
}
