//! The alert record.
//!
//! An alert's identity, reporter, location and resolved facilities are frozen
//! when it is built. Only the status and the two dispatch flags change
//! afterwards, and only through [`Alert::apply`] / [`Alert::mark_sent`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  facility::{FacilityKind, NearestFacility},
  geo::Location,
  ids,
};

// ─── Reporter ────────────────────────────────────────────────────────────────

/// Who raised the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
  #[serde(rename = "userName", alias = "fullName")]
  pub full_name:     String,
  pub id_number:     String,
  pub contact:       String,
  /// Synthetic identity token; never verified.
  pub blockchain_id: String,
}

impl Reporter {
  /// A reporter with a freshly generated identity token.
  pub fn new(
    full_name: impl Into<String>,
    id_number: impl Into<String>,
    contact: impl Into<String>,
  ) -> Self {
    Self {
      full_name:     full_name.into(),
      id_number:     id_number.into(),
      contact:       contact.into(),
      blockchain_id: ids::identity_token(),
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Alert status. Open-ended: unknown values survive a round trip as
/// [`AlertStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertStatus {
  #[default]
  Pending,
  Dispatched,
  Resolved,
  Other(String),
}

impl AlertStatus {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Pending => "pending",
      Self::Dispatched => "dispatched",
      Self::Resolved => "resolved",
      Self::Other(s) => s,
    }
  }
}

impl From<String> for AlertStatus {
  fn from(s: String) -> Self {
    match s.as_str() {
      "pending" => Self::Pending,
      "dispatched" => Self::Dispatched,
      "resolved" => Self::Resolved,
      _ => Self::Other(s),
    }
  }
}

impl From<AlertStatus> for String {
  fn from(status: AlertStatus) -> Self {
    match status {
      AlertStatus::Other(s) => s,
      known => known.as_str().to_owned(),
    }
  }
}

impl fmt::Display for AlertStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A merge patch over the mutable fields of an [`Alert`]. Absent fields are
/// left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:           Option<AlertStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sent_to_police:   Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sent_to_hospital: Option<bool>,
}

impl AlertPatch {
  pub fn status(status: AlertStatus) -> Self {
    Self { status: Some(status), ..Self::default() }
  }

  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.sent_to_police.is_none() && self.sent_to_hospital.is_none()
  }
}

impl From<&Alert> for AlertPatch {
  /// The full mutable state of `alert`, as a patch.
  fn from(alert: &Alert) -> Self {
    Self {
      status:           Some(alert.status.clone()),
      sent_to_police:   Some(alert.sent_to_police),
      sent_to_hospital: Some(alert.sent_to_hospital),
    }
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
  pub(crate) id:               String,
  #[serde(flatten)]
  pub(crate) reporter:         Reporter,
  pub(crate) latitude:         f64,
  pub(crate) longitude:        f64,
  pub(crate) nearest_police:   NearestFacility,
  pub(crate) nearest_hospital: NearestFacility,
  pub(crate) timestamp:        DateTime<Utc>,
  pub(crate) status:           AlertStatus,
  pub(crate) transaction_hash: String,
  pub(crate) sent_to_police:   bool,
  pub(crate) sent_to_hospital: bool,
}

impl Alert {
  pub fn id(&self) -> &str { &self.id }

  pub fn reporter(&self) -> &Reporter { &self.reporter }

  pub fn location(&self) -> Location {
    Location { latitude: self.latitude, longitude: self.longitude }
  }

  pub fn nearest_police(&self) -> &NearestFacility { &self.nearest_police }

  pub fn nearest_hospital(&self) -> &NearestFacility { &self.nearest_hospital }

  pub fn nearest(&self, kind: FacilityKind) -> &NearestFacility {
    match kind {
      FacilityKind::Police => &self.nearest_police,
      FacilityKind::Hospital => &self.nearest_hospital,
    }
  }

  pub fn timestamp(&self) -> DateTime<Utc> { self.timestamp }

  pub fn status(&self) -> &AlertStatus { &self.status }

  pub fn transaction_hash(&self) -> &str { &self.transaction_hash }

  pub fn sent_to_police(&self) -> bool { self.sent_to_police }

  pub fn sent_to_hospital(&self) -> bool { self.sent_to_hospital }

  pub fn is_sent_to(&self, kind: FacilityKind) -> bool {
    match kind {
      FacilityKind::Police => self.sent_to_police,
      FacilityKind::Hospital => self.sent_to_hospital,
    }
  }

  /// Merge `patch` into the mutable fields. Returns whether anything changed.
  pub fn apply(&mut self, patch: &AlertPatch) -> bool {
    let before = (self.status.clone(), self.sent_to_police, self.sent_to_hospital);
    if let Some(status) = &patch.status {
      self.status = status.clone();
    }
    if let Some(sent) = patch.sent_to_police {
      self.sent_to_police = sent;
    }
    if let Some(sent) = patch.sent_to_hospital {
      self.sent_to_hospital = sent;
    }
    before != (self.status.clone(), self.sent_to_police, self.sent_to_hospital)
  }

  /// Record that the alert was forwarded to the nearest facility of `kind`.
  pub fn mark_sent(&mut self, kind: FacilityKind) -> bool {
    let patch = match kind {
      FacilityKind::Police => AlertPatch { sent_to_police: Some(true), ..AlertPatch::default() },
      FacilityKind::Hospital => {
        AlertPatch { sent_to_hospital: Some(true), ..AlertPatch::default() }
      }
    };
    self.apply(&patch)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::facility::Facility;

  /// A fixed alert for tests across the crate.
  pub(crate) fn sample_alert(id: &str) -> Alert {
    Alert {
      id:               id.to_owned(),
      reporter:         Reporter {
        full_name:     "Asha Rao".into(),
        id_number:     "P1234567".into(),
        contact:       "+91-9876543210".into(),
        blockchain_id: "0xabc".into(),
      },
      latitude:         12.9716,
      longitude:        77.5946,
      nearest_police:   NearestFacility {
        facility:    Facility::new(1, "Cubbon Park Police Station", 12.9762, 77.5993),
        distance_km: 0.72,
      },
      nearest_hospital: NearestFacility {
        facility:    Facility::new(1, "Manipal Hospital", 12.9698, 77.6205),
        distance_km: 2.81,
      },
      timestamp:        Utc.with_ymd_and_hms(2025, 9, 22, 10, 30, 0).unwrap(),
      status:           AlertStatus::Pending,
      transaction_hash: "0xdef".into(),
      sent_to_police:   false,
      sent_to_hospital: false,
    }
  }

  #[test]
  fn serialises_with_camel_case_wire_names() {
    let json = serde_json::to_value(sample_alert("id_1")).unwrap();
    for key in [
      "id",
      "userName",
      "idNumber",
      "blockchainId",
      "contact",
      "latitude",
      "longitude",
      "nearestPolice",
      "nearestHospital",
      "timestamp",
      "status",
      "transactionHash",
      "sentToPolice",
      "sentToHospital",
    ] {
      assert!(json.get(key).is_some(), "missing {key}: {json}");
    }
    assert_eq!(json["status"], "pending");
    assert_eq!(json["nearestPolice"]["distance"], 0.72);

    let back: Alert = serde_json::from_value(json).unwrap();
    assert_eq!(back, sample_alert("id_1"));
  }

  #[test]
  fn unknown_status_survives_round_trip() {
    let status: AlertStatus = serde_json::from_str(r#""escalated""#).unwrap();
    assert_eq!(status, AlertStatus::Other("escalated".into()));
    assert_eq!(serde_json::to_string(&status).unwrap(), r#""escalated""#);
    assert_eq!(
      serde_json::from_str::<AlertStatus>(r#""resolved""#).unwrap(),
      AlertStatus::Resolved
    );
  }

  #[test]
  fn apply_merges_only_present_fields() {
    let mut alert = sample_alert("id_1");
    let changed = alert.apply(&AlertPatch {
      sent_to_hospital: Some(true),
      ..AlertPatch::default()
    });
    assert!(changed);
    assert!(alert.sent_to_hospital());
    assert!(!alert.sent_to_police());
    assert_eq!(alert.status(), &AlertStatus::Pending);

    assert!(!alert.apply(&AlertPatch::default()));
    assert!(alert.apply(&AlertPatch::status(AlertStatus::Resolved)));
    assert!(!alert.apply(&AlertPatch::status(AlertStatus::Resolved)));
  }

  #[test]
  fn patch_ignores_immutable_fields() {
    let patch: AlertPatch =
      serde_json::from_str(r#"{"status": "resolved", "userName": "Mallory", "id": "x"}"#)
        .unwrap();
    let mut alert = sample_alert("id_1");
    alert.apply(&patch);
    assert_eq!(alert.id(), "id_1");
    assert_eq!(alert.reporter().full_name, "Asha Rao");
    assert_eq!(alert.status(), &AlertStatus::Resolved);
  }

  #[test]
  fn mark_sent_is_independent_of_status() {
    let mut alert = sample_alert("id_1");
    assert!(alert.mark_sent(FacilityKind::Police));
    assert!(!alert.mark_sent(FacilityKind::Police));
    assert!(alert.is_sent_to(FacilityKind::Police));
    assert!(!alert.is_sent_to(FacilityKind::Hospital));
    assert_eq!(alert.status(), &AlertStatus::Pending);
  }
}
