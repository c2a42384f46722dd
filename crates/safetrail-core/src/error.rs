//! Error types for `safetrail-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Nearest-facility resolution was asked to pick from nothing.
  #[error("facility set is empty")]
  EmptyFacilitySet,

  #[error("alert not found: {0}")]
  AlertNotFound(String),

  /// The primary broadcast channel does not exist in this runtime.
  #[error("primary broadcast channel unavailable")]
  ChannelUnavailable,

  #[error("invalid coordinate: lat {lat}, lng {lng}")]
  InvalidCoordinate { lat: f64, lng: f64 },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from a [`crate::store::KeyValueStore`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
