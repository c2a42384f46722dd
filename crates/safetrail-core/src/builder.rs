//! Assembling alert records.
//!
//! Two entry points: [`build_alert`] for a reporting client that knows who and
//! where it is, and [`AlertSubmission::into_alert`] for the relay, which has to
//! accept partially filled records from the wire.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
  Result,
  alert::{Alert, AlertStatus, Reporter},
  facility::{FacilityCatalog, FacilityKind, NearestFacility},
  geo::Location,
  ids,
};

/// Build a fresh `pending` alert for `reporter` at `location`, resolving the
/// nearest police station and hospital from `catalog`.
pub fn build_alert(
  reporter: &Reporter,
  location: Location,
  catalog: &FacilityCatalog,
) -> Result<Alert> {
  build_alert_at(reporter, location, catalog, Utc::now())
}

/// [`build_alert`] with an explicit creation time.
pub fn build_alert_at(
  reporter: &Reporter,
  location: Location,
  catalog: &FacilityCatalog,
  now: DateTime<Utc>,
) -> Result<Alert> {
  let nearest_police = catalog.nearest(FacilityKind::Police, &location)?;
  let nearest_hospital = catalog.nearest(FacilityKind::Hospital, &location)?;
  let id = ids::client_alert_id(now);
  let transaction_hash = ids::transaction_hash(&id, now);

  Ok(Alert {
    id,
    reporter: reporter.clone(),
    latitude: location.latitude,
    longitude: location.longitude,
    nearest_police,
    nearest_hospital,
    timestamp: now,
    status: AlertStatus::Pending,
    transaction_hash,
    sent_to_police: false,
    sent_to_hospital: false,
  })
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// An alert as received by the relay. Everything the reporter may have left
/// out is optional and filled in by [`AlertSubmission::into_alert`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSubmission {
  pub id:               Option<String>,
  #[serde(alias = "fullName")]
  pub user_name:        String,
  pub id_number:        String,
  pub contact:          String,
  pub blockchain_id:    Option<String>,
  #[serde(alias = "lat")]
  pub latitude:         f64,
  #[serde(alias = "lng")]
  pub longitude:        f64,
  pub nearest_police:   Option<NearestFacility>,
  pub nearest_hospital: Option<NearestFacility>,
  pub timestamp:        Option<DateTime<Utc>>,
  pub status:           Option<AlertStatus>,
  pub transaction_hash: Option<String>,
  #[serde(default)]
  pub sent_to_police:   bool,
  #[serde(default)]
  pub sent_to_hospital: bool,
}

impl AlertSubmission {
  /// Complete the submission into an [`Alert`].
  ///
  /// A missing id becomes `alert_<millis>_<random>`, a missing timestamp
  /// becomes `now`, and missing facilities are resolved against `catalog`.
  /// Fields the reporter did send are kept as sent.
  pub fn into_alert(self, catalog: &FacilityCatalog, now: DateTime<Utc>) -> Result<Alert> {
    let location = Location::new(self.latitude, self.longitude)?;

    let nearest_police = match self.nearest_police {
      Some(n) => n,
      None => catalog.nearest(FacilityKind::Police, &location)?,
    };
    let nearest_hospital = match self.nearest_hospital {
      Some(n) => n,
      None => catalog.nearest(FacilityKind::Hospital, &location)?,
    };

    let id = self
      .id
      .filter(|id| !id.is_empty())
      .unwrap_or_else(|| ids::relay_alert_id(now));
    let timestamp = self.timestamp.unwrap_or(now);
    let transaction_hash = self
      .transaction_hash
      .unwrap_or_else(|| ids::transaction_hash(&id, timestamp));

    Ok(Alert {
      id,
      reporter: Reporter {
        full_name:     self.user_name,
        id_number:     self.id_number,
        contact:       self.contact,
        blockchain_id: self.blockchain_id.unwrap_or_else(ids::identity_token),
      },
      latitude: location.latitude,
      longitude: location.longitude,
      nearest_police,
      nearest_hospital,
      timestamp,
      status: self.status.unwrap_or_default(),
      transaction_hash,
      sent_to_police: self.sent_to_police,
      sent_to_hospital: self.sent_to_hospital,
    })
  }
}
