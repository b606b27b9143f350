//! Telephony webhook handlers.
//!
//! Every handler is a single stateless step: decode the provider's form
//! payload, run one [`Switchboard`](switchboard_core::Switchboard)
//! operation, and answer with TwiML. Payloads missing the call or tenant
//! identifier are acknowledged without touching any state, and a step that
//! fails in the store apologises and listens again.

pub mod audio;
pub mod speech;
pub mod status;
pub mod voice;

use axum::extract::{Form, rejection::FormRejection};
use serde::Deserialize;
use switchboard_core::NextAction;
use tracing::{error, warn};

pub const APOLOGY_MESSAGE: &str =
  "Sorry, something went wrong on our end. Could you please say that again?";

/// The subset of the provider's callback fields this server reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallEvent {
  #[serde(default)]
  pub call_sid:      String,
  /// The dialled number, which identifies the tenant.
  #[serde(default)]
  pub to:            String,
  #[serde(default)]
  pub from:          String,
  pub speech_result: Option<String>,
  pub call_status:   Option<String>,
}

impl CallEvent {
  /// The decoded event, or `None` if it cannot be attributed to a call.
  pub fn accept(form: Result<Form<Self>, FormRejection>) -> Option<Self> {
    match form {
      Ok(Form(event))
        if !event.call_sid.trim().is_empty() && !event.to.trim().is_empty() =>
      {
        Some(event)
      }
      Ok(Form(event)) => {
        warn!(call_sid = %event.call_sid, to = %event.to, "webhook missing call or tenant id");
        None
      }
      Err(e) => {
        warn!(error = %e, "undecodable webhook payload");
        None
      }
    }
  }
}

/// The action to answer with when a call step could not complete.
pub fn recover(result: switchboard_core::Result<NextAction>, call_sid: &str) -> NextAction {
  result.unwrap_or_else(|e| {
    error!(%call_sid, error = %e, "call step failed");
    NextAction::SayThenGather(APOLOGY_MESSAGE.to_owned())
  })
}

#[cfg(test)]
mod tests {
  use switchboard_core::{Error, session::ResolvedBy};

  use super::*;

  #[test]
  fn failed_step_apologises_and_listens() {
    let failed = Err(Error::NotTerminal(ResolvedBy::Unset));
    assert_eq!(
      recover(failed, "CA1"),
      NextAction::SayThenGather(APOLOGY_MESSAGE.to_owned())
    );
  }

  #[test]
  fn successful_step_passes_through() {
    let done = Ok(NextAction::SayAndEnd("bye".into()));
    assert_eq!(recover(done, "CA1"), NextAction::SayAndEnd("bye".into()));
  }
}
