//! Async HTTP client wrapping the relay's JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response};
use safetrail_api::{
  alerts::{DeleteResponse, ListResponse, SubmitResponse, UpdateResponse},
  health::HealthResponse,
};
use safetrail_core::alert::{Alert, AlertPatch};
use serde::Deserialize;

/// Connection settings for the relay.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the relay REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

/// The relay's error body.
#[derive(Deserialize)]
struct Failure {
  message: String,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Turn a non-2xx response into an error carrying the relay's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<Failure>()
      .await
      .map(|f| f.message)
      .unwrap_or_else(|_| "no details".to_owned());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  /// `POST /sos-alert`
  pub async fn submit(&self, alert: &Alert) -> Result<String> {
    let resp = self
      .client
      .post(self.url("/sos-alert"))
      .json(alert)
      .send()
      .await
      .context("POST /sos-alert failed")?;
    let body: SubmitResponse = Self::check(resp, "POST /sos-alert")
      .await?
      .json()
      .await
      .context("deserialising submit response")?;
    Ok(body.alert_id)
  }

  /// `GET /alerts`
  pub async fn list(&self) -> Result<Vec<Alert>> {
    let resp = self
      .client
      .get(self.url("/alerts"))
      .send()
      .await
      .context("GET /alerts failed")?;
    let body: ListResponse = Self::check(resp, "GET /alerts")
      .await?
      .json()
      .await
      .context("deserialising alerts")?;
    Ok(body.alerts)
  }

  /// `PUT /alerts/{id}`
  pub async fn update(&self, id: &str, patch: &AlertPatch) -> Result<Alert> {
    let what = format!("PUT /alerts/{id}");
    let resp = self
      .client
      .put(self.url(&format!("/alerts/{id}")))
      .json(patch)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let body: UpdateResponse = Self::check(resp, &what)
      .await?
      .json()
      .await
      .context("deserialising updated alert")?;
    Ok(body.alert)
  }

  /// `DELETE /alerts/{id}`
  pub async fn delete(&self, id: &str) -> Result<Alert> {
    let what = format!("DELETE /alerts/{id}");
    let resp = self
      .client
      .delete(self.url(&format!("/alerts/{id}")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let body: DeleteResponse = Self::check(resp, &what)
      .await?
      .json()
      .await
      .context("deserialising deleted alert")?;
    Ok(body.deleted_alert)
  }

  /// `GET /health`
  pub async fn health(&self) -> Result<HealthResponse> {
    let resp = self
      .client
      .get(self.url("/health"))
      .send()
      .await
      .context("GET /health failed")?;
    Self::check(resp, "GET /health")
      .await?
      .json()
      .await
      .context("deserialising health response")
  }
}
