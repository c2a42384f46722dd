//! Handlers for the alert endpoints.
//!
//! | Method   | Path           | Notes |
//! |----------|----------------|-------|
//! | `POST`   | `/sos-alert`   | Body: alert JSON; `id`, `timestamp`, facilities optional |
//! | `GET`    | `/alerts`      | Snapshot of the cache |
//! | `PUT`    | `/alerts/{id}` | Body: patch of `status` / `sentToPolice` / `sentToHospital`; 404 if unknown |
//! | `DELETE` | `/alerts/{id}` | 404 if unknown |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use chrono::Utc;
use safetrail_core::{
  alert::{Alert, AlertPatch},
  builder::AlertSubmission,
  event::RelayEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::ApiError, state::RelayState};

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
  pub success:  bool,
  pub message:  String,
  pub alert_id: String,
}

/// `POST /sos-alert`
///
/// Fills in whatever the reporter left out, appends the alert to the cache
/// and broadcasts `new-sos-alert`. Re-submitting a known id changes nothing
/// and broadcasts nothing, but still answers with that id.
pub async fn submit(
  State(state): State<RelayState>,
  payload: Result<Json<AlertSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
  let Json(submission) = payload?;
  let alert = submission.into_alert(&state.catalog, Utc::now())?;
  let alert_id = alert.id().to_owned();

  let mut alerts = state.alerts.write().await;
  if alerts.insert(alert.clone()) {
    info!(%alert_id, reporter = %alert.reporter().full_name, "SOS alert received");
    state.publish(None, RelayEvent::NewSosAlert(alert));
  } else {
    debug!(%alert_id, "duplicate submission ignored");
  }

  Ok(Json(SubmitResponse {
    success: true,
    message: "SOS Alert received successfully".into(),
    alert_id,
  }))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
  pub success: bool,
  pub alerts:  Vec<Alert>,
  pub total:   usize,
}

/// `GET /alerts`
pub async fn list(State(state): State<RelayState>) -> Json<ListResponse> {
  let alerts = state.alerts.read().await.as_slice().to_vec();
  Json(ListResponse { success: true, total: alerts.len(), alerts })
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
  pub success: bool,
  pub message: String,
  pub alert:   Alert,
}

/// `PUT /alerts/{id}`: merges the patch and broadcasts `alert-updated`.
///
/// Only the mutable fields are read from the body; anything else is ignored.
pub async fn update(
  State(state): State<RelayState>,
  Path(id): Path<String>,
  payload: Result<Json<AlertPatch>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
  let Json(patch) = payload?;

  let mut alerts = state.alerts.write().await;
  let alert = alerts.update_status(&id, &patch)?.clone();
  info!(alert_id = %id, status = %alert.status(), "alert updated");
  state.publish(None, RelayEvent::AlertUpdated(alert.clone()));

  Ok(Json(UpdateResponse {
    success: true,
    message: "Alert updated successfully".into(),
    alert,
  }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
  pub success:       bool,
  pub message:       String,
  pub deleted_alert: Alert,
}

/// `DELETE /alerts/{id}`: removes the alert and broadcasts `alert-deleted`.
pub async fn remove(
  State(state): State<RelayState>,
  Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
  let mut alerts = state.alerts.write().await;
  let deleted_alert = alerts.delete(&id)?;
  info!(alert_id = %id, "alert deleted");
  state.publish(None, RelayEvent::AlertDeleted(id));

  Ok(Json(DeleteResponse {
    success: true,
    message: "Alert deleted successfully".into(),
    deleted_alert,
  }))
}
