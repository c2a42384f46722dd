//! Plain-text rendering of alerts for the terminal.

use safetrail_core::{alert::Alert, alert_store::AlertStats};

/// One line per alert: id, status, reporter, position and nearest facilities.
pub fn alert_line(alert: &Alert) -> String {
  let police = alert.nearest_police();
  let hospital = alert.nearest_hospital();
  format!(
    "{id}  [{status}]  {name} ({contact})  @ {lat:.4},{lng:.4}  police: {p} ({pd:.2} km){ps}  hospital: {h} ({hd:.2} km){hs}",
    id = alert.id(),
    status = alert.status(),
    name = alert.reporter().full_name,
    contact = alert.reporter().contact,
    lat = alert.location().latitude,
    lng = alert.location().longitude,
    p = police.facility.name,
    pd = police.distance_km,
    ps = if alert.sent_to_police() { " sent" } else { "" },
    h = hospital.facility.name,
    hd = hospital.distance_km,
    hs = if alert.sent_to_hospital() { " sent" } else { "" },
  )
}

pub fn stats_line(stats: &AlertStats) -> String {
  format!(
    "total {}  pending {}  resolved {}  reporters {}",
    stats.total, stats.pending, stats.resolved, stats.reporters
  )
}
