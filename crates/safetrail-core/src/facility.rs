//! Facilities (police stations, hospitals) and nearest-facility resolution.
//!
//! Catalogs are small, fixed reference data shared read-only by every
//! component, so resolution is an exhaustive scan that never mutates its
//! input.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, geo::Location};

// ─── Facility ────────────────────────────────────────────────────────────────

/// Which catalog list a facility belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FacilityKind {
  Police,
  Hospital,
}

/// A fixed point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
  pub id:        u32,
  pub name:      String,
  #[serde(rename = "lat", alias = "latitude")]
  pub latitude:  f64,
  #[serde(rename = "lng", alias = "longitude")]
  pub longitude: f64,
}

impl Facility {
  pub fn new(id: u32, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
    Self { id, name: name.into(), latitude, longitude }
  }

  pub fn location(&self) -> Location {
    Location { latitude: self.latitude, longitude: self.longitude }
  }
}

/// A facility paired with its distance from the location it was resolved
/// against. Frozen into an alert at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestFacility {
  #[serde(flatten)]
  pub facility:    Facility,
  #[serde(rename = "distance")]
  pub distance_km: f64,
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Return the facility closest to `location` together with its distance.
///
/// Ties go to the earliest facility in `facilities`. Fails with
/// [`Error::EmptyFacilitySet`] when there is nothing to choose from.
pub fn resolve_nearest(location: &Location, facilities: &[Facility]) -> Result<NearestFacility> {
  facilities
    .iter()
    .map(|f| (f, location.distance_to(&f.location())))
    // `min_by` keeps the first of several equal minima.
    .min_by(|(_, a), (_, b)| a.total_cmp(b))
    .map(|(f, distance_km)| NearestFacility { facility: f.clone(), distance_km })
    .ok_or(Error::EmptyFacilitySet)
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The reference facility set, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityCatalog {
  #[serde(default)]
  pub police:    Vec<Facility>,
  #[serde(default)]
  pub hospitals: Vec<Facility>,
}

impl FacilityCatalog {
  /// The built-in Bengaluru sample catalog.
  pub fn bengaluru() -> Self {
    Self {
      police:    vec![
        Facility::new(1, "Cubbon Park Police Station", 12.9762, 77.5993),
        Facility::new(2, "Vidhana Soudha Police Station", 12.9795, 77.5910),
        Facility::new(3, "UB City Police Station", 12.9719, 77.6095),
        Facility::new(4, "Commercial Street Police Station", 12.9831, 77.6101),
      ],
      hospitals: vec![
        Facility::new(1, "Manipal Hospital", 12.9698, 77.6205),
        Facility::new(2, "St. John's Medical College", 12.9312, 77.6228),
        Facility::new(3, "Apollo Hospital", 12.9180, 77.6170),
        Facility::new(4, "Fortis Hospital", 12.9279, 77.6271),
      ],
    }
  }

  /// Parse a catalog from its JSON form (`{"police": [...], "hospitals": [...]}`).
  pub fn from_json(json: &str) -> Result<Self> { Ok(serde_json::from_str(json)?) }

  pub fn facilities(&self, kind: FacilityKind) -> &[Facility] {
    match kind {
      FacilityKind::Police => &self.police,
      FacilityKind::Hospital => &self.hospitals,
    }
  }

  pub fn nearest(&self, kind: FacilityKind, location: &Location) -> Result<NearestFacility> {
    resolve_nearest(location, self.facilities(kind))
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  const MG_ROAD: Location = Location { latitude: 12.9716, longitude: 77.5946 };

  #[test]
  fn resolves_cubbon_park_for_central_bengaluru() {
    let catalog = FacilityCatalog::bengaluru();
    let nearest = catalog.nearest(FacilityKind::Police, &MG_ROAD).unwrap();
    assert_eq!(nearest.facility.name, "Cubbon Park Police Station");
    assert!(
      (0.5..0.8).contains(&nearest.distance_km),
      "distance {}",
      nearest.distance_km
    );

    let hospital = catalog.nearest(FacilityKind::Hospital, &MG_ROAD).unwrap();
    assert_eq!(hospital.facility.name, "Manipal Hospital");
  }

  #[test]
  fn empty_set_is_an_error() {
    assert!(matches!(
      resolve_nearest(&MG_ROAD, &[]),
      Err(Error::EmptyFacilitySet)
    ));
  }

  #[test]
  fn ties_go_to_the_first_facility() {
    let here = Location { latitude: 10.0, longitude: 10.0 };
    let twins = [
      Facility::new(7, "first", 10.0, 10.5),
      Facility::new(8, "second", 10.0, 10.5),
    ];
    assert_eq!(resolve_nearest(&here, &twins).unwrap().facility.id, 7);
  }

  #[test]
  fn resolution_leaves_the_catalog_untouched() {
    let catalog = FacilityCatalog::bengaluru();
    let before = catalog.clone();
    catalog.nearest(FacilityKind::Police, &MG_ROAD).unwrap();
    assert_eq!(catalog, before);
  }

  #[test]
  fn nearest_serialises_with_flattened_facility_and_distance() {
    let nearest = NearestFacility {
      facility:    Facility::new(1, "Somewhere", 1.0, 2.0),
      distance_km: 0.25,
    };
    let json = serde_json::to_value(&nearest).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "id": 1, "name": "Somewhere", "lat": 1.0, "lng": 2.0, "distance": 0.25
      })
    );
    let back: NearestFacility = serde_json::from_value(json).unwrap();
    assert_eq!(back, nearest);
  }

  #[test]
  fn catalog_parses_from_json_with_missing_lists() {
    let catalog = FacilityCatalog::from_json(
      r#"{"police": [{"id": 1, "name": "P", "latitude": 1.0, "longitude": 1.0}]}"#,
    )
    .unwrap();
    assert_eq!(catalog.police.len(), 1);
    assert!(catalog.hospitals.is_empty());
  }

  #[test]
  fn kind_parses_case_insensitively() {
    assert_eq!("Police".parse::<FacilityKind>().unwrap(), FacilityKind::Police);
    assert_eq!(FacilityKind::Hospital.to_string(), "hospital");
  }

  fn any_facilities() -> impl Strategy<Value = Vec<Facility>> {
    prop::collection::vec((-60.0f64..60.0, -170.0f64..170.0), 1..12).prop_map(|coords| {
      coords
        .into_iter()
        .enumerate()
        .map(|(i, (lat, lng))| Facility::new(i as u32, format!("f{i}"), lat, lng))
        .collect()
    })
  }

  proptest! {
    #[test]
    fn resolved_facility_minimises_distance(
      facilities in any_facilities(),
      lat in -60.0f64..60.0,
      lng in -170.0f64..170.0,
    ) {
      let here = Location { latitude: lat, longitude: lng };
      let nearest = resolve_nearest(&here, &facilities).unwrap();
      let winner = facilities
        .iter()
        .position(|f| f.id == nearest.facility.id)
        .unwrap();
      for (i, f) in facilities.iter().enumerate() {
        let d = here.distance_to(&f.location());
        prop_assert!(nearest.distance_km <= d);
        if i < winner {
          // Anything earlier must be strictly further away.
          prop_assert!(nearest.distance_km < d);
        }
      }
    }
  }
}
