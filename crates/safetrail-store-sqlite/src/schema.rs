//! SQL schema for the Safetrail SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per key. A write replaces the row; there is no history.
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,   -- JSON document, opaque to the store
    updated_at TEXT NOT NULL    -- ISO 8601 UTC of the last write
);

PRAGMA user_version = 1;
";
