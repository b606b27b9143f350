//! [`MemoryStore`] — a process-local [`KeyValueStore`].
//!
//! Intended for tests and single-process experiments; nothing survives a
//! restart.

use std::{
  collections::{BTreeMap, HashMap},
  convert::Infallible,
  sync::{Mutex, MutexGuard},
  time::{Duration, Instant},
};

use crate::store::KeyValueStore;

#[derive(Debug)]
struct Entry {
  value:      String,
  expires_at: Option<Instant>,
}

impl Entry {
  fn is_live(&self, now: Instant) -> bool {
    self.expires_at.is_none_or(|at| at > now)
  }
}

#[derive(Debug, Default)]
struct Inner {
  entries:  HashMap<String, Entry>,
  counters: HashMap<String, BTreeMap<String, i64>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Number of live (unexpired) entries.
  pub fn len(&self) -> usize {
    let now = Instant::now();
    self.lock().entries.values().filter(|e| e.is_live(now)).count()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    let now = Instant::now();
    let mut inner = self.lock();
    if inner.entries.get(key).is_some_and(|e| !e.is_live(now)) {
      inner.entries.remove(key);
    }
    Ok(inner.entries.get(key).map(|e| e.value.clone()))
  }

  async fn set(
    &self,
    key:   &str,
    value: String,
    ttl:   Option<Duration>,
  ) -> Result<(), Infallible> {
    let expires_at = ttl.map(|ttl| Instant::now() + ttl);
    self.lock().entries.insert(key.to_owned(), Entry { value, expires_at });
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool, Infallible> {
    let now = Instant::now();
    Ok(
      self
        .lock()
        .entries
        .remove(key)
        .is_some_and(|entry| entry.is_live(now)),
    )
  }

  async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64, Infallible> {
    let mut inner = self.lock();
    let count = inner
      .counters
      .entry(key.to_owned())
      .or_default()
      .entry(field.to_owned())
      .or_default();
    *count += by;
    Ok(*count)
  }

  async fn counters(&self, key: &str) -> Result<BTreeMap<String, i64>, Infallible> {
    Ok(self.lock().counters.get(key).cloned().unwrap_or_default())
  }
}
