//! The Safetrail relay: a forwarding point between reporters and dashboards.
//!
//! Serves the REST API from `safetrail-api` plus a WebSocket endpoint that
//! pushes [`RelayEvent`](safetrail_core::event::RelayEvent)s to every
//! connected observer.

pub mod config;
pub mod ws;

use axum::{Router, http::StatusCode, routing::get};
use safetrail_api::RelayState;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use config::RelayConfig;

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete relay router: REST API, `GET /ws`, and a `204` favicon
/// so browsers stop asking. CORS is open to any origin.
pub fn router(state: RelayState) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods(Any)
    .allow_headers(Any);

  Router::new()
    .route("/ws", get(ws::handler))
    .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
    .with_state(state.clone())
    .merge(safetrail_api::api_router(state))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
}
