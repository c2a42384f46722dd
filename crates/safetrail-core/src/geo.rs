//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
///
/// Serialised as `{"lat": …, "lng": …}`; `latitude` / `longitude` are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  #[serde(rename = "lat", alias = "latitude")]
  pub latitude:  f64,
  #[serde(rename = "lng", alias = "longitude")]
  pub longitude: f64,
}

impl Location {
  /// Build a location, rejecting coordinates outside `[-90, 90]` /
  /// `[-180, 180]` (and NaN).
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    let location = Self { latitude, longitude };
    if location.is_valid() {
      Ok(location)
    } else {
      Err(Error::InvalidCoordinate { lat: latitude, lng: longitude })
    }
  }

  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.latitude)
      && (-180.0..=180.0).contains(&self.longitude)
  }

  /// Great-circle distance to `other` in kilometres.
  pub fn distance_to(&self, other: &Location) -> f64 {
    haversine_km(self, other)
  }
}

/// Haversine great-circle distance between two points, in kilometres.
///
/// Symmetric, non-negative, and exactly `0.0` for identical inputs. Inputs are
/// assumed to be in range; see [`Location::new`].
pub fn haversine_km(a: &Location, b: &Location) -> f64 {
  let d_lat = (b.latitude - a.latitude).to_radians();
  let d_lng = (b.longitude - a.longitude).to_radians();

  let sin_lat = (d_lat / 2.0).sin();
  let sin_lng = (d_lng / 2.0).sin();
  let h = sin_lat * sin_lat
    + a.latitude.to_radians().cos()
      * b.latitude.to_radians().cos()
      * sin_lng
      * sin_lng;

  // Rounding can push `h` a hair outside [0, 1] for antipodal points.
  let h = h.clamp(0.0, 1.0);
  2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn loc(lat: f64, lng: f64) -> Location { Location::new(lat, lng).unwrap() }

  #[test]
  fn identical_points_are_zero_apart() {
    let p = loc(12.9716, 77.5946);
    assert_eq!(haversine_km(&p, &p), 0.0);
  }

  #[test]
  fn one_degree_of_latitude_is_about_111_km() {
    let d = haversine_km(&loc(0.0, 0.0), &loc(1.0, 0.0));
    assert!((d - 111.19).abs() < 0.01, "got {d}");
  }

  #[test]
  fn antipodes_are_half_the_circumference() {
    let d = haversine_km(&loc(0.0, 0.0), &loc(0.0, 180.0));
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
  }

  #[test]
  fn out_of_range_coordinates_are_rejected() {
    assert!(matches!(
      Location::new(91.0, 0.0),
      Err(Error::InvalidCoordinate { .. })
    ));
    assert!(Location::new(0.0, -180.5).is_err());
    assert!(Location::new(f64::NAN, 0.0).is_err());
    assert!(Location::new(-90.0, 180.0).is_ok());
  }

  #[test]
  fn serde_uses_lat_lng_and_accepts_long_names() {
    let json = serde_json::to_value(loc(1.5, 2.5)).unwrap();
    assert_eq!(json, serde_json::json!({ "lat": 1.5, "lng": 2.5 }));

    let parsed: Location =
      serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5}"#).unwrap();
    assert_eq!(parsed, loc(1.5, 2.5));
  }

  fn any_location() -> impl Strategy<Value = Location> {
    (-90.0f64..=90.0, -180.0f64..=180.0)
      .prop_map(|(latitude, longitude)| Location { latitude, longitude })
  }

  proptest! {
    #[test]
    fn distance_is_symmetric(a in any_location(), b in any_location()) {
      prop_assert_eq!(haversine_km(&a, &b), haversine_km(&b, &a));
    }

    #[test]
    fn distance_to_self_is_zero(a in any_location()) {
      prop_assert_eq!(haversine_km(&a, &a), 0.0);
    }

    #[test]
    fn distance_is_bounded(a in any_location(), b in any_location()) {
      let d = haversine_km(&a, &b);
      prop_assert!(d >= 0.0);
      prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
    }
  }
}
