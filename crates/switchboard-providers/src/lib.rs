//! HTTP clients for the hosted language model and speech synthesizer.
//!
//! [`OpenAiChat`] implements [`LanguageModel`] against any
//! OpenAI-compatible chat-completions endpoint; [`ElevenLabsVoice`]
//! implements [`SpeechSynthesizer`] against the ElevenLabs text-to-speech
//! API. Both are cheap to clone and safe to share across requests.
//!
//! [`LanguageModel`]: switchboard_core::provider::LanguageModel
//! [`SpeechSynthesizer`]: switchboard_core::provider::SpeechSynthesizer

mod elevenlabs;
mod openai;

pub mod error;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsVoice};
pub use error::{Error, Result};
pub use openai::{OpenAiChat, OpenAiConfig};
