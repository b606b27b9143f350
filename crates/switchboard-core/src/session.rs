//! Call sessions — the per-call conversation record.
//!
//! A session is created when a call arrives, advanced one step per speech
//! event, and archived as a [`CallLog`] when the call ends. Its invariants
//! (one leading system turn, write-once intent, write-once resolution) are
//! enforced by the mutators here and re-checked whenever a stored session is
//! decoded, so a record that violates them never reaches the state machine.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Turns ───────────────────────────────────────────────────────────────────

/// Who authored a turn; mirrors the chat-completion message roles.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Turn {
  pub role:    Role,
  pub content: String,
}

impl Turn {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// How a call ended. `Unset` until the session reaches a terminal state.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedBy {
  #[default]
  Unset,
  Ai,
  Human,
  Limit,
  TimeLimit,
}

impl ResolvedBy {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Unset) }

  /// The daily analytics counter this outcome increments, e.g.
  /// `resolved_HUMAN`.
  pub fn counter_name(self) -> String { format!("resolved_{self}") }
}

/// The caller's purpose, classified once per call.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
  Sales,
  Support,
  Info,
  Unknown,
}

impl Intent {
  /// Parse a classifier reply. Only the first word counts; surrounding
  /// punctuation and case are ignored and anything outside the taxonomy is
  /// [`Intent::Unknown`].
  pub fn from_label(raw: &str) -> Self {
    let word = raw
      .split_whitespace()
      .next()
      .unwrap_or_default()
      .trim_matches(|c: char| !c.is_alphanumeric())
      .to_lowercase();
    word.parse().unwrap_or(Self::Unknown)
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The live state of one call, keyed by `(tenant_id, call_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCallSession")]
pub struct CallSession {
  call_id:     String,
  tenant_id:   String,
  caller:      String,
  intent:      Option<Intent>,
  started_at:  DateTime<Utc>,
  resolved_by: ResolvedBy,
  turns:       Vec<Turn>,
}

impl CallSession {
  /// Start a session whose history holds only the system prompt.
  pub fn new(
    tenant_id:     impl Into<String>,
    call_id:       impl Into<String>,
    caller:        impl Into<String>,
    system_prompt: impl Into<String>,
    now:           DateTime<Utc>,
  ) -> Self {
    Self {
      call_id:     call_id.into(),
      tenant_id:   tenant_id.into(),
      caller:      caller.into(),
      intent:      None,
      started_at:  now,
      resolved_by: ResolvedBy::Unset,
      turns:       vec![Turn::system(system_prompt)],
    }
  }

  pub fn call_id(&self) -> &str { &self.call_id }

  pub fn tenant_id(&self) -> &str { &self.tenant_id }

  pub fn caller(&self) -> &str { &self.caller }

  pub fn intent(&self) -> Option<Intent> { self.intent }

  pub fn started_at(&self) -> DateTime<Utc> { self.started_at }

  pub fn resolved_by(&self) -> ResolvedBy { self.resolved_by }

  pub fn turns(&self) -> &[Turn] { &self.turns }

  /// A resolved session accepts no further turns.
  pub fn is_closed(&self) -> bool { self.resolved_by.is_terminal() }

  /// Number of user/assistant exchanges after the system prompt.
  pub fn completed_pairs(&self) -> usize { (self.turns.len() - 1) / 2 }

  pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta { now - self.started_at }

  pub fn push_user(&mut self, content: impl Into<String>) -> Result<()> {
    self.ensure_open()?;
    self.turns.push(Turn::user(content));
    Ok(())
  }

  pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<()> {
    self.ensure_open()?;
    self.turns.push(Turn::assistant(content));
    Ok(())
  }

  /// Record the intent unless one is already set. Returns whether the value
  /// was stored.
  pub fn set_intent(&mut self, intent: Intent) -> bool {
    if self.intent.is_some() {
      return false;
    }
    self.intent = Some(intent);
    true
  }

  /// Move the session to a terminal outcome. Fails if it is already closed
  /// or `outcome` is [`ResolvedBy::Unset`].
  pub fn resolve(&mut self, outcome: ResolvedBy) -> Result<()> {
    if !outcome.is_terminal() {
      return Err(Error::NotTerminal(outcome));
    }
    self.ensure_open()?;
    self.resolved_by = outcome;
    Ok(())
  }

  /// Freeze the session into its archival record.
  pub fn into_log(self, ended_at: DateTime<Utc>) -> CallLog {
    let duration_sec = self.elapsed(ended_at).num_seconds().max(0);
    CallLog { session: self, duration_sec, ended_at }
  }

  fn ensure_open(&self) -> Result<()> {
    if self.is_closed() {
      return Err(Error::AlreadyResolved {
        call_id: self.call_id.clone(),
        outcome: self.resolved_by,
      });
    }
    Ok(())
  }
}

/// Wire shape of a stored session, validated into [`CallSession`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCallSession {
  call_id:     String,
  tenant_id:   String,
  caller:      String,
  intent:      Option<Intent>,
  started_at:  DateTime<Utc>,
  resolved_by: ResolvedBy,
  turns:       Vec<Turn>,
}

/// Why a stored session was rejected.
#[derive(Debug)]
pub struct InvalidSession(&'static str);

impl fmt::Display for InvalidSession {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid call session: {}", self.0)
  }
}

impl TryFrom<RawCallSession> for CallSession {
  type Error = InvalidSession;

  fn try_from(raw: RawCallSession) -> Result<Self, Self::Error> {
    match raw.turns.first() {
      Some(t) if t.role == Role::System => {}
      _ => return Err(InvalidSession("first turn must be the system prompt")),
    }
    if raw.turns[1..].iter().any(|t| t.role == Role::System) {
      return Err(InvalidSession("more than one system turn"));
    }

    Ok(Self {
      call_id:     raw.call_id,
      tenant_id:   raw.tenant_id,
      caller:      raw.caller,
      intent:      raw.intent,
      started_at:  raw.started_at,
      resolved_by: raw.resolved_by,
      turns:       raw.turns,
    })
  }
}

// ─── Archive ─────────────────────────────────────────────────────────────────

/// Immutable snapshot of a finished call. Never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallLog {
  pub session:      CallSession,
  pub duration_sec: i64,
  pub ended_at:     DateTime<Utc>,
}
