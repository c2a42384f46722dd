//! `GET /health`: liveness probe.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::RelayState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
  pub success:      bool,
  pub message:      String,
  pub timestamp:    DateTime<Utc>,
  pub alerts_count: usize,
}

pub async fn handler(State(state): State<RelayState>) -> Json<HealthResponse> {
  Json(HealthResponse {
    success:      true,
    message:      "Server is running".into(),
    timestamp:    Utc::now(),
    alerts_count: state.alerts.read().await.len(),
  })
}
