//! [`SqliteStore`] — the SQLite implementation of [`KeyValueStore`].

use std::{collections::BTreeMap, path::Path, time::Duration};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use switchboard_core::store::KeyValueStore;

use crate::{
  Error, Result,
  expiry::{expires_at, now_millis},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Switchboard key-value store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Physically remove every expired entry. Returns how many were removed.
  ///
  /// Expired entries already read as absent; this only reclaims space.
  pub async fn purge_expired(&self) -> Result<usize> {
    let now = now_millis();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
          rusqlite::params![now],
        )?)
      })
      .await?;
    debug!(removed, "purged expired entries");
    Ok(removed)
  }
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let now = now_millis();
    let value = self
      .conn
      .call(move |conn| {
        let value: Option<String> = conn
          .query_row(
            "SELECT value FROM entries
             WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
            rusqlite::params![key, now],
            |r| r.get(0),
          )
          .optional()?;
        if value.is_none() {
          // Drop a lapsed row as soon as it is noticed.
          conn.execute(
            "DELETE FROM entries
             WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
            rusqlite::params![key, now],
          )?;
        }
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
    let key = key.to_owned();
    let expires = expires_at(Utc::now(), ttl);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entries (key, value, expires_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, expires_at = excluded.expires_at",
          rusqlite::params![key, value, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool> {
    let key = key.to_owned();
    let now = now_millis();
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let live = tx.execute(
          "DELETE FROM entries
           WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
          rusqlite::params![key, now],
        )?;
        // Whatever is left under the key had already expired.
        tx.execute("DELETE FROM entries WHERE key = ?1", rusqlite::params![key])?;
        tx.commit()?;
        Ok(live > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64> {
    let key = key.to_owned();
    let field = field.to_owned();
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO counters (key, field, count) VALUES (?1, ?2, ?3)
           ON CONFLICT(key, field) DO UPDATE SET count = count + excluded.count
           RETURNING count",
          rusqlite::params![key, field, by],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  async fn counters(&self, key: &str) -> Result<BTreeMap<String, i64>> {
    let key = key.to_owned();
    let counters = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT field, count FROM counters WHERE key = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![key], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
          })?
          .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
      })
      .await?;
    Ok(counters)
  }
}
