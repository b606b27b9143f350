//! Traits for the hosted services a call talks to.

use std::future::Future;

use bytes::Bytes;

use crate::session::Turn;

/// A chat-completion model.
pub trait LanguageModel: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Produce the next assistant message for an ordered message list.
  fn complete<'a>(
    &'a self,
    messages: &'a [Turn],
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

/// A text-to-speech service.
pub trait SpeechSynthesizer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Render `text` as playable audio.
  fn synthesize<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send + 'a;

  /// MIME type of the audio returned by [`synthesize`](Self::synthesize).
  fn content_type(&self) -> &'static str { "audio/mpeg" }
}
