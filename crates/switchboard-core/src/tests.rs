//! State-machine tests over [`MemoryStore`] with scripted collaborators.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use bytes::Bytes;
use chrono::{TimeDelta, Utc};

use crate::{
  Error, NextAction, Switchboard,
  action::{MAX_LENGTH_MESSAGE, RETRY_MESSAGE, TIMED_OUT_MESSAGE},
  audio::AudioStore,
  finalizer::FinalizeStep,
  memory::MemoryStore,
  policy::SessionPolicy,
  provider::{LanguageModel, SpeechSynthesizer},
  session::{Intent, ResolvedBy, Role, Turn},
  store::{KeyValueStore, SessionStore, keys},
  tenant::TenantConfig,
};

// ─── Doubles ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("provider unavailable")]
struct Unavailable;

/// Answers classifier prompts with `label` and everything else with
/// `reply`, counting both kinds of call.
struct ScriptedModel {
  label:          Mutex<String>,
  reply:          Mutex<Option<String>>,
  classify_fails: AtomicBool,
  classify_calls: AtomicUsize,
  reply_calls:    AtomicUsize,
  last_history:   Mutex<Vec<Turn>>,
}

impl ScriptedModel {
  fn new(label: &str, reply: &str) -> Self {
    Self {
      label:          Mutex::new(label.to_owned()),
      reply:          Mutex::new(Some(reply.to_owned())),
      classify_fails: AtomicBool::new(false),
      classify_calls: AtomicUsize::new(0),
      reply_calls:    AtomicUsize::new(0),
      last_history:   Mutex::new(Vec::new()),
    }
  }

  fn calls(&self) -> usize {
    self.classify_calls.load(Ordering::SeqCst) + self.reply_calls.load(Ordering::SeqCst)
  }
}

impl LanguageModel for ScriptedModel {
  type Error = Unavailable;

  async fn complete(&self, messages: &[Turn]) -> Result<String, Unavailable> {
    if messages[0].content.starts_with("Classify") {
      self.classify_calls.fetch_add(1, Ordering::SeqCst);
      if self.classify_fails.load(Ordering::SeqCst) {
        return Err(Unavailable);
      }
      return Ok(self.label.lock().unwrap().clone());
    }
    self.reply_calls.fetch_add(1, Ordering::SeqCst);
    *self.last_history.lock().unwrap() = messages.to_vec();
    self.reply.lock().unwrap().clone().ok_or(Unavailable)
  }
}

#[derive(Default)]
struct FakeVoice {
  fails: AtomicBool,
}

impl SpeechSynthesizer for FakeVoice {
  type Error = Unavailable;

  async fn synthesize(&self, text: &str) -> Result<Bytes, Unavailable> {
    if self.fails.load(Ordering::SeqCst) {
      return Err(Unavailable);
    }
    Ok(Bytes::from(format!("ID3:{text}")))
  }
}

/// A [`MemoryStore`] whose operations can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
  inner:           MemoryStore,
  fail_all:        AtomicBool,
  fail_increments: AtomicBool,
}

impl FlakyStore {
  fn check(&self) -> Result<(), Unavailable> {
    if self.fail_all.load(Ordering::SeqCst) { Err(Unavailable) } else { Ok(()) }
  }
}

impl KeyValueStore for FlakyStore {
  type Error = Unavailable;

  async fn get(&self, key: &str) -> Result<Option<String>, Unavailable> {
    self.check()?;
    Ok(self.inner.get(key).await.unwrap_or_default())
  }

  async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), Unavailable> {
    self.check()?;
    let _ = self.inner.set(key, value, ttl).await;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool, Unavailable> {
    self.check()?;
    Ok(self.inner.delete(key).await.unwrap_or_default())
  }

  async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64, Unavailable> {
    self.check()?;
    if self.fail_increments.load(Ordering::SeqCst) {
      return Err(Unavailable);
    }
    Ok(self.inner.increment(key, field, by).await.unwrap_or_default())
  }

  async fn counters(&self, key: &str) -> Result<BTreeMap<String, i64>, Unavailable> {
    self.check()?;
    Ok(self.inner.counters(key).await.unwrap_or_default())
  }
}

struct Harness {
  kv:    Arc<FlakyStore>,
  model: Arc<ScriptedModel>,
  voice: Arc<FakeVoice>,
  board: Switchboard<FlakyStore, ScriptedModel, FakeVoice>,
}

fn harness() -> Harness {
  let kv    = Arc::new(FlakyStore::default());
  let model = Arc::new(ScriptedModel::new("sales", "We open at nine."));
  let voice = Arc::new(FakeVoice::default());
  let board = Switchboard::new(
    Arc::clone(&kv),
    Arc::clone(&model),
    Arc::clone(&voice),
    SessionPolicy::default(),
    TenantConfig::default(),
  );
  Harness { kv, model, voice, board }
}

const TENANT: &str = "+15550000001";
const CALLER: &str = "+15551234567";

// ─── Call start ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_call_seeds_single_system_turn_and_greets() {
  let h = harness();
  let action = h.board.start_call(TENANT, "CA1", CALLER, Utc::now()).await.unwrap();

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 1);
  assert_eq!(session.turns()[0].role, Role::System);
  assert!(session.turns()[0].content.contains("our office"));
  assert_eq!(session.resolved_by(), ResolvedBy::Unset);
  assert_eq!(session.intent(), None);
  assert_eq!(session.caller(), CALLER);

  let NextAction::PlayThenGather(audio) = action else {
    panic!("expected greeting audio, got {action:?}");
  };
  let clip = h.board.audio().get(audio.as_str()).await.unwrap().unwrap();
  assert!(clip.starts_with(b"ID3:Thank you for calling our office"));
  assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn duplicate_start_overwrites_session() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  h.board.handle_speech(TENANT, "CA1", "hours?", now).await.unwrap();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 1);
}

#[tokio::test]
async fn greeting_falls_back_to_provider_voice() {
  let h = harness();
  h.voice.fails.store(true, Ordering::SeqCst);
  let action = h.board.start_call(TENANT, "CA1", CALLER, Utc::now()).await.unwrap();
  assert_eq!(
    action,
    NextAction::SayThenGather(
      "Thank you for calling our office. How can I help you today?".into()
    )
  );
}

// ─── Turns ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn speech_appends_pair_and_plays_reply() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();

  let action = h.board.handle_speech(TENANT, "CA1", "When do you open?", now).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)));

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
  assert_eq!(roles, [Role::System, Role::User, Role::Assistant]);
  assert_eq!(session.turns()[1].content, "When do you open?");
  assert_eq!(session.turns()[2].content, "We open at nine.");
  assert_eq!(session.intent(), Some(Intent::Sales));

  // The reply model saw the full history including the new user turn.
  let history = h.model.last_history.lock().unwrap().clone();
  assert_eq!(history.len(), 2);
  assert_eq!(history[1], Turn::user("When do you open?"));
}

#[tokio::test]
async fn empty_utterance_is_a_valid_turn() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  h.board.handle_speech(TENANT, "CA1", "", now).await.unwrap();

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns()[1], Turn::user(""));
}

#[tokio::test]
async fn system_turn_stays_first_across_many_turns() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  for i in 0..10 {
    h.board
      .handle_speech(TENANT, "CA1", &format!("question {i}"), now)
      .await
      .unwrap();
  }
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 21);
  assert_eq!(session.turns()[0].role, Role::System);
  assert_eq!(
    session.turns().iter().filter(|t| t.role == Role::System).count(),
    1
  );
}

#[tokio::test]
async fn intent_is_classified_once() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  h.board.handle_speech(TENANT, "CA1", "I'd like to buy", now).await.unwrap();

  *h.model.label.lock().unwrap() = "support".into();
  h.board.handle_speech(TENANT, "CA1", "my order broke", now).await.unwrap();
  h.board.handle_speech(TENANT, "CA1", "it really broke", now).await.unwrap();

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.intent(), Some(Intent::Sales));
  assert_eq!(h.model.classify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_classification_is_retried_next_turn() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();

  h.model.classify_fails.store(true, Ordering::SeqCst);
  let action = h.board.handle_speech(TENANT, "CA1", "hello", now).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)));
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.intent(), None);
  assert_eq!(session.turns().len(), 3);

  h.model.classify_fails.store(false, Ordering::SeqCst);
  h.board.handle_speech(TENANT, "CA1", "pricing please", now).await.unwrap();
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.intent(), Some(Intent::Sales));
}

#[tokio::test]
async fn failed_reply_leaves_session_untouched() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();

  *h.model.reply.lock().unwrap() = None;
  let action = h.board.handle_speech(TENANT, "CA1", "hello?", now).await.unwrap();
  assert_eq!(action, NextAction::SayThenGather(RETRY_MESSAGE.into()));

  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 1);

  *h.model.reply.lock().unwrap() = Some("Hi there.".into());
  h.board.handle_speech(TENANT, "CA1", "hello?", now).await.unwrap();
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 3);
}

#[tokio::test]
async fn blank_reply_counts_as_failure() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  *h.model.reply.lock().unwrap() = Some("   ".into());

  let action = h.board.handle_speech(TENANT, "CA1", "hello?", now).await.unwrap();
  assert_eq!(action, NextAction::SayThenGather(RETRY_MESSAGE.into()));
}

#[tokio::test]
async fn synthesis_failure_still_persists_reply() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  h.voice.fails.store(true, Ordering::SeqCst);

  let action = h.board.handle_speech(TENANT, "CA1", "hours?", now).await.unwrap();
  assert_eq!(action, NextAction::SayThenGather("We open at nine.".into()));
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 3);
}

#[tokio::test]
async fn unknown_session_is_acknowledged() {
  let h = harness();
  let action = h.board.handle_speech(TENANT, "nope", "hi", Utc::now()).await.unwrap();
  assert_eq!(action, NextAction::AckOnly);
  assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn store_failure_is_an_error() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA1", CALLER, now).await.unwrap();
  h.kv.fail_all.store(true, Ordering::SeqCst);

  let result = h.board.handle_speech(TENANT, "CA1", "hi", now).await;
  assert!(matches!(result, Err(Error::Store(_))));
}

#[tokio::test]
async fn tenants_do_not_share_call_ids() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call("tenant-a", "CA1", CALLER, now).await.unwrap();
  h.board.start_call("tenant-b", "CA1", CALLER, now).await.unwrap();
  h.board.handle_speech("tenant-a", "CA1", "hello", now).await.unwrap();

  let a = h.board.sessions().get("tenant-a", "CA1").await.unwrap().unwrap();
  let b = h.board.sessions().get("tenant-b", "CA1").await.unwrap().unwrap();
  assert_eq!(a.turns().len(), 3);
  assert_eq!(b.turns().len(), 1);
}

// ─── Budgets ─────────────────────────────────────────────────────────────────

async fn seed_pairs(h: &Harness, call_id: &str, pairs: usize) {
  let now = Utc::now();
  h.board.start_call(TENANT, call_id, CALLER, now).await.unwrap();
  let mut session = h.board.sessions().get(TENANT, call_id).await.unwrap().unwrap();
  for i in 0..pairs {
    session.push_user(format!("q{i}")).unwrap();
    session.push_assistant(format!("a{i}")).unwrap();
  }
  h.board.sessions().save(&session).await.unwrap();
}

#[tokio::test]
async fn twenty_first_pair_hits_turn_limit() {
  let h = harness();
  seed_pairs(&h, "CA2", 20).await;

  let action = h.board.handle_speech(TENANT, "CA2", "one more", Utc::now()).await.unwrap();
  assert_eq!(action, NextAction::SayAndEnd(MAX_LENGTH_MESSAGE.into()));
  assert!(MAX_LENGTH_MESSAGE.contains("maximum length"));
  assert_eq!(h.model.calls(), 0);

  let session = h.board.sessions().get(TENANT, "CA2").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::Limit);
  assert_eq!(session.turns().len(), 41);
}

#[tokio::test]
async fn twentieth_pair_is_still_allowed() {
  let h = harness();
  seed_pairs(&h, "CA2", 19).await;

  let action = h.board.handle_speech(TENANT, "CA2", "last one", Utc::now()).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)));
  let session = h.board.sessions().get(TENANT, "CA2").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::Unset);
  assert_eq!(session.completed_pairs(), 20);
}

#[tokio::test]
async fn speech_after_time_budget_times_out() {
  let h = harness();
  let start = Utc::now();
  h.board.start_call(TENANT, "CA3", CALLER, start).await.unwrap();

  let late = start + TimeDelta::seconds(901);
  let action = h.board.handle_speech(TENANT, "CA3", "still there?", late).await.unwrap();
  assert_eq!(action, NextAction::SayAndEnd(TIMED_OUT_MESSAGE.into()));
  assert_eq!(h.model.calls(), 0);

  let session = h.board.sessions().get(TENANT, "CA3").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::TimeLimit);
  assert_eq!(session.turns().len(), 1);
}

#[tokio::test]
async fn speech_at_exact_time_budget_proceeds() {
  let h = harness();
  let start = Utc::now();
  h.board.start_call(TENANT, "CA3", CALLER, start).await.unwrap();

  let edge = start + TimeDelta::seconds(900);
  let action = h.board.handle_speech(TENANT, "CA3", "hi", edge).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)));
}

#[tokio::test]
async fn turn_limit_is_checked_before_time_limit() {
  let h = harness();
  seed_pairs(&h, "CA4", 20).await;
  let late = Utc::now() + TimeDelta::hours(1);
  h.board.handle_speech(TENANT, "CA4", "hello", late).await.unwrap();
  let session = h.board.sessions().get(TENANT, "CA4").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::Limit);
}

// ─── Expiry ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_lapses_after_ttl() {
  let sessions = SessionStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(100));
  sessions
    .create(TENANT, "CA1", CALLER, &TenantConfig::default(), Utc::now())
    .await
    .unwrap();
  assert!(sessions.get(TENANT, "CA1").await.unwrap().is_some());

  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(sessions.get(TENANT, "CA1").await.unwrap().is_none());
}

#[tokio::test]
async fn save_pushes_expiry_out() {
  let sessions = SessionStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(300));
  let session = sessions
    .create(TENANT, "CA1", CALLER, &TenantConfig::default(), Utc::now())
    .await
    .unwrap();

  tokio::time::sleep(Duration::from_millis(200)).await;
  sessions.save(&session).await.unwrap();
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(sessions.get(TENANT, "CA1").await.unwrap().is_some());

  tokio::time::sleep(Duration::from_millis(400)).await;
  assert!(sessions.get(TENANT, "CA1").await.unwrap().is_none());
}

#[tokio::test]
async fn turns_keep_session_alive_until_caller_goes_quiet() {
  let policy = SessionPolicy { session_ttl_secs: 1, ..SessionPolicy::default() };
  let board = Switchboard::new(
    Arc::new(MemoryStore::new()),
    Arc::new(ScriptedModel::new("info", "Sure.")),
    Arc::new(FakeVoice::default()),
    policy,
    TenantConfig::default(),
  );
  board.start_call(TENANT, "CA1", CALLER, Utc::now()).await.unwrap();

  tokio::time::sleep(Duration::from_millis(600)).await;
  let action = board.handle_speech(TENANT, "CA1", "hello", Utc::now()).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)), "{action:?}");

  // Past the original deadline, but the turn above refreshed it.
  tokio::time::sleep(Duration::from_millis(600)).await;
  let action = board.handle_speech(TENANT, "CA1", "still there?", Utc::now()).await.unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)), "{action:?}");

  tokio::time::sleep(Duration::from_millis(1300)).await;
  let action = board.handle_speech(TENANT, "CA1", "hello?", Utc::now()).await.unwrap();
  assert_eq!(action, NextAction::AckOnly);
  assert!(board.sessions().get(TENANT, "CA1").await.unwrap().is_none());
}

#[tokio::test]
async fn audio_clip_lapses_after_ttl() {
  let audio = AudioStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(100));
  assert_eq!(audio.ttl(), Duration::from_millis(100));

  let clip = audio.put(b"ID3:hello").await.unwrap();
  assert_eq!(
    audio.get(clip.as_str()).await.unwrap().as_deref(),
    Some(&b"ID3:hello"[..])
  );

  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(audio.get(clip.as_str()).await.unwrap().is_none());
}

// ─── Human transfer ──────────────────────────────────────────────────────────

#[tokio::test]
async fn transfer_keywords_are_case_insensitive_substrings() {
  for utterance in [
    "Can I speak to an OPERATOR?",
    "get me a Human",
    "is there an agent around",
    "I need a personal loan",
  ] {
    let h = harness();
    let now = Utc::now();
    h.board.start_call(TENANT, "CA5", CALLER, now).await.unwrap();
    let action = h.board.handle_speech(TENANT, "CA5", utterance, now).await.unwrap();
    assert_eq!(
      action,
      NextAction::TransferToHuman("+15555550100".into()),
      "utterance: {utterance}"
    );
    assert_eq!(h.model.calls(), 0);
  }
}

#[tokio::test]
async fn transfer_disabled_tenant_gets_ai_reply() {
  let h = harness();
  let now = Utc::now();
  let config = TenantConfig { human_transfer: false, ..TenantConfig::default() };
  h.board.tenants().store(TENANT, &config).await.unwrap();
  h.board.start_call(TENANT, "CA6", CALLER, now).await.unwrap();

  let action = h.board
    .handle_speech(TENANT, "CA6", "I want to talk to a human", now)
    .await
    .unwrap();
  assert!(matches!(action, NextAction::PlayThenGather(_)));
  let session = h.board.sessions().get(TENANT, "CA6").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::Unset);
}

#[tokio::test]
async fn transfer_uses_tenant_agent_address() {
  let h = harness();
  let now = Utc::now();
  let config = TenantConfig {
    agent_address: "+15559990000".into(),
    ..TenantConfig::default()
  };
  h.board.tenants().store(TENANT, &config).await.unwrap();
  h.board.start_call(TENANT, "CA7", CALLER, now).await.unwrap();

  let action = h.board.handle_speech(TENANT, "CA7", "operator", now).await.unwrap();
  assert_eq!(action, NextAction::TransferToHuman("+15559990000".into()));
}

#[tokio::test]
async fn resolved_session_accepts_no_more_turns() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "CA8", CALLER, now).await.unwrap();
  h.board.handle_speech(TENANT, "CA8", "human please", now).await.unwrap();

  let again = h.board.handle_speech(TENANT, "CA8", "hello?", now).await.unwrap();
  assert_eq!(again, NextAction::TransferToHuman("+15555550100".into()));

  let session = h.board.sessions().get(TENANT, "CA8").await.unwrap().unwrap();
  assert_eq!(session.resolved_by(), ResolvedBy::Human);
  assert_eq!(session.turns().len(), 2);
  assert_eq!(h.model.calls(), 0);
}

// ─── Finalization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn human_transfer_call_lifecycle() {
  let h = harness();
  let start = Utc::now();
  h.board.start_call(TENANT, "C1", CALLER, start).await.unwrap();
  let session = h.board.sessions().get(TENANT, "C1").await.unwrap().unwrap();
  assert_eq!(session.turns().len(), 1);

  let action = h.board
    .handle_speech(TENANT, "C1", "I want to talk to a human", start)
    .await
    .unwrap();
  assert_eq!(action, NextAction::TransferToHuman("+15555550100".into()));

  let end = start + TimeDelta::seconds(42);
  let report = h.board.end_call(TENANT, "C1", end).await.unwrap().unwrap();
  assert!(report.is_complete());
  assert_eq!(report.log.duration_sec, 42);
  assert_eq!(report.log.ended_at, end);

  let log = h.board.ledger().call_log(TENANT, "C1").await.unwrap().unwrap();
  assert_eq!(log.session.resolved_by(), ResolvedBy::Human);
  assert_eq!(log.session.turns().len(), 2);

  let counters = h.board.ledger().daily(TENANT, end.date_naive()).await.unwrap();
  assert_eq!(counters.get("total_calls"), Some(&1));
  assert_eq!(counters.get("resolved_HUMAN"), Some(&1));

  assert!(h.board.sessions().get(TENANT, "C1").await.unwrap().is_none());
}

#[tokio::test]
async fn finalize_twice_counts_once() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "C9", CALLER, now).await.unwrap();

  assert!(h.board.end_call(TENANT, "C9", now).await.unwrap().is_some());
  assert!(h.board.end_call(TENANT, "C9", now).await.unwrap().is_none());

  let counters = h.board.ledger().daily(TENANT, now.date_naive()).await.unwrap();
  assert_eq!(counters.get("total_calls"), Some(&1));
  assert_eq!(counters.get("resolved_UNSET"), Some(&1));
}

#[tokio::test]
async fn finalize_unknown_call_is_noop() {
  let h = harness();
  assert!(h.board.end_call(TENANT, "ghost", Utc::now()).await.unwrap().is_none());
  let counters = h.board.ledger().daily(TENANT, Utc::now().date_naive()).await.unwrap();
  assert!(counters.is_empty());
}

#[tokio::test]
async fn finalize_deletes_session_even_when_counting_fails() {
  let h = harness();
  let now = Utc::now();
  h.board.start_call(TENANT, "C10", CALLER, now).await.unwrap();
  h.kv.fail_increments.store(true, Ordering::SeqCst);

  let report = h.board.end_call(TENANT, "C10", now).await.unwrap().unwrap();
  assert_eq!(
    report.failed,
    [FinalizeStep::TotalCounter, FinalizeStep::OutcomeCounter]
  );
  assert!(h.board.ledger().call_log(TENANT, "C10").await.unwrap().is_some());
  assert!(h.board.sessions().get(TENANT, "C10").await.unwrap().is_none());
}

#[tokio::test]
async fn finalize_discards_malformed_session() {
  let h = harness();
  h.kv
    .set(&keys::session(TENANT, "C11"), "{\"not\":\"a session\"}".into(), None)
    .await
    .unwrap();

  assert!(h.board.end_call(TENANT, "C11", Utc::now()).await.unwrap().is_none());
  assert!(h.kv.get(&keys::session(TENANT, "C11")).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_session_is_rejected_on_load() {
  let h = harness();
  h.kv
    .set(&keys::session(TENANT, "C12"), "{\"resolved_by\":\"ROBOT\"}".into(), None)
    .await
    .unwrap();
  let result = h.board.sessions().get(TENANT, "C12").await;
  assert!(matches!(result, Err(Error::MalformedRecord { .. })));
}

// ─── Tenants ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_tenant_resolves_to_defaults() {
  let h = harness();
  assert_eq!(h.board.tenants().resolve("unknown").await, TenantConfig::default());
}

#[tokio::test]
async fn stored_tenant_config_is_resolved() {
  let h = harness();
  let config = TenantConfig {
    business_name: "Acme Plumbing".into(),
    ..TenantConfig::default()
  };
  h.board.tenants().store(TENANT, &config).await.unwrap();
  assert_eq!(h.board.tenants().resolve(TENANT).await, config);

  h.board.start_call(TENANT, "CA1", CALLER, Utc::now()).await.unwrap();
  let session = h.board.sessions().get(TENANT, "CA1").await.unwrap().unwrap();
  assert!(session.turns()[0].content.contains("Acme Plumbing"));
}

#[tokio::test]
async fn unreadable_tenant_config_resolves_to_defaults() {
  let h = harness();
  h.kv.set(&keys::tenant(TENANT), "not json".into(), None).await.unwrap();
  assert_eq!(h.board.tenants().resolve(TENANT).await, TenantConfig::default());

  h.kv.fail_all.store(true, Ordering::SeqCst);
  assert_eq!(h.board.tenants().resolve(TENANT).await, TenantConfig::default());
}

#[test]
fn transfer_without_agent_address_is_invalid() {
  let config = TenantConfig { agent_address: " ".into(), ..TenantConfig::default() };
  assert!(matches!(config.validate(), Err(Error::InvalidTenantConfig(_))));

  let config = TenantConfig { human_transfer: false, ..config };
  assert!(config.validate().is_ok());
  assert!(TenantConfig::default().validate().is_ok());
}
