//! The `KeyValueStore` trait and an in-memory implementation.
//!
//! The store is the persisted, shared medium behind the fallback channel: a
//! flat string-to-string map that every process on the same device can read
//! and write. Backends (e.g. `safetrail-store-sqlite`) implement the trait;
//! everything above it depends on this abstraction only.

use std::{collections::HashMap, convert::Infallible, future::Future, sync::Arc};

use tokio::sync::RwLock;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a persisted key-value backend.
///
/// Values are opaque strings (JSON in practice). Writes replace the previous
/// value wholesale; there is no history.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tasks in multi-threaded runtimes.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the current value for `key`, or `None` if unset.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Replace the value for `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete `key`. Removing an absent key is not an error.
  fn remove<'a>(&'a self, key: &'a str) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A process-local [`KeyValueStore`].
///
/// Cloning is cheap and clones share the same map, which is how tests model
/// several observers on one device.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.entries.read().await.get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.entries.write().await.insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.entries.write().await.remove(key);
    Ok(())
  }
}
