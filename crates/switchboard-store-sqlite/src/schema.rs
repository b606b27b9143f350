//! SQL schema for the Switchboard SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Plain values. Rows whose expires_at has passed read as absent and are
-- removed by the periodic purge.
CREATE TABLE IF NOT EXISTS entries (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    expires_at  INTEGER            -- unix epoch milliseconds; NULL = never
);

-- Counter hashes: one row per (key, field).
CREATE TABLE IF NOT EXISTS counters (
    key    TEXT    NOT NULL,
    field  TEXT    NOT NULL,
    count  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (key, field)
);

CREATE INDEX IF NOT EXISTS entries_expiry_idx ON entries(expires_at)
    WHERE expires_at IS NOT NULL;

PRAGMA user_version = 1;
";
