//! What the call-control layer should do next.
//!
//! The state machine only ever produces a [`NextAction`]; turning it into
//! provider markup is the webhook adapter's job.

use crate::audio::AudioRef;

pub const MAX_LENGTH_MESSAGE: &str =
  "This call has reached its maximum length. Thank you for calling, goodbye.";

pub const TIMED_OUT_MESSAGE: &str =
  "This call has timed out. Thank you for calling, goodbye.";

pub const RETRY_MESSAGE: &str =
  "Sorry, I'm having trouble right now. Could you please say that again?";

pub const GOODBYE_MESSAGE: &str = "Thank you for calling, goodbye.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
  /// Play a synthesized clip, then listen for the caller's reply.
  PlayThenGather(AudioRef),
  /// Speak `text` with the telephony provider's own voice, then listen.
  SayThenGather(String),
  /// Speak `text` and hang up.
  SayAndEnd(String),
  /// Connect the caller to a human at this address.
  TransferToHuman(String),
  /// Acknowledge the webhook without further instruction.
  AckOnly,
}

impl NextAction {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::SayAndEnd(_) | Self::TransferToHuman(_))
  }
}
