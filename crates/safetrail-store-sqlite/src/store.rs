//! [`SqliteKvStore`]: the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use safetrail_core::store::KeyValueStore;

use crate::{Error, Result, schema::SCHEMA};

/// A key-value store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteKvStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteKvStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
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

  /// Every key currently set, in key order.
  pub async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
          .query_map([], |row| row.get(0))?
          .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }
}

impl KeyValueStore for SqliteKvStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT value FROM kv WHERE key = ?1", rusqlite::params![key], |row| {
              row.get(0)
            })
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();
    let at = Utc::now().to_rfc3339();
    debug!(%key, bytes = value.len(), "kv write");

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
          rusqlite::params![key, value, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
