//! Call finalization: archive, count, and clear a finished call.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  analytics::{AnalyticsLedger, TOTAL_CALLS},
  session::CallLog,
  store::{KeyValueStore, SessionStore},
};

/// A finalization step that can fail without aborting the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStep {
  Archive,
  TotalCounter,
  OutcomeCounter,
  DeleteSession,
}

/// What [`Finalizer::finalize`] did for a call that was still live.
#[derive(Debug, Clone)]
pub struct FinalizeReport {
  pub log:    CallLog,
  /// Steps that failed; each was logged and skipped.
  pub failed: Vec<FinalizeStep>,
}

impl FinalizeReport {
  pub fn is_complete(&self) -> bool { self.failed.is_empty() }
}

pub struct Finalizer<K> {
  sessions: SessionStore<K>,
  ledger:   AnalyticsLedger<K>,
}

impl<K: KeyValueStore> Finalizer<K> {
  pub fn new(sessions: SessionStore<K>, ledger: AnalyticsLedger<K>) -> Self {
    Self { sessions, ledger }
  }

  /// Archive the call, bump the tenant's daily counters, and delete the
  /// live session.
  ///
  /// Returns `Ok(None)` when there is no live session, which makes a repeated
  /// call a no-op: counters are only incremented by the call that found the
  /// session. After the session has loaded, the remaining steps are
  /// best-effort; failures are logged and listed in the report and the
  /// session delete is always attempted.
  pub async fn finalize(
    &self,
    tenant_id: &str,
    call_id:   &str,
    now:       DateTime<Utc>,
  ) -> Result<Option<FinalizeReport>> {
    let session = match self.sessions.get(tenant_id, call_id).await {
      Ok(Some(session)) => session,
      Ok(None) => {
        debug!(%tenant_id, %call_id, "no live session to finalize");
        return Ok(None);
      }
      Err(e @ Error::MalformedRecord { .. }) => {
        warn!(%tenant_id, %call_id, error = %e, "discarding malformed session");
        self.sessions.delete(tenant_id, call_id).await?;
        return Ok(None);
      }
      Err(e) => return Err(e),
    };

    let outcome = session.resolved_by();
    let log = session.into_log(now);
    let day = now.date_naive();
    let mut failed = Vec::new();

    if let Err(e) = self.ledger.archive(&log).await {
      warn!(%tenant_id, %call_id, error = %e, "failed to archive call log");
      failed.push(FinalizeStep::Archive);
    }
    if let Err(e) = self.ledger.increment(tenant_id, day, TOTAL_CALLS).await {
      warn!(%tenant_id, %call_id, error = %e, "failed to count call");
      failed.push(FinalizeStep::TotalCounter);
    }
    if let Err(e) = self
      .ledger
      .increment(tenant_id, day, &outcome.counter_name())
      .await
    {
      warn!(%tenant_id, %call_id, error = %e, "failed to count call outcome");
      failed.push(FinalizeStep::OutcomeCounter);
    }
    if let Err(e) = self.sessions.delete(tenant_id, call_id).await {
      warn!(%tenant_id, %call_id, error = %e, "failed to delete live session");
      failed.push(FinalizeStep::DeleteSession);
    }

    info!(
      %tenant_id, %call_id, %outcome, duration_sec = log.duration_sec,
      "call finalized"
    );
    Ok(Some(FinalizeReport { log, failed }))
  }
}
