//! JSON REST API of the Safetrail relay.
//!
//! Exposes an axum [`Router`] over a shared [`RelayState`]. Every write is
//! re-broadcast to connected observers through the state's event sender; the
//! persistent-connection transport that carries those events, CORS and
//! request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().merge(safetrail_api::api_router(state.clone()))
//! ```

pub mod alerts;
pub mod error;
pub mod health;
pub mod state;

use axum::{
  Router,
  routing::{get, post, put},
};

pub use error::ApiError;
pub use state::{Outbound, RelayState};

/// Build the relay's REST router for `state`.
pub fn api_router(state: RelayState) -> Router<()> {
  Router::new()
    .route("/sos-alert", post(alerts::submit))
    .route("/alerts", get(alerts::list))
    .route("/alerts/{id}", put(alerts::update).delete(alerts::remove))
    .route("/health", get(health::handler))
    .with_state(state)
}
