//! Geographic points and great-circle distance.
//!
//! Coordinates follow the GeoJSON convention used by the map client:
//! longitude first, then latitude, both in decimal degrees (WGS 84).

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_METRES: f64 = 6_371_008.8;

/// Errors that can occur when building a [`GeoPoint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A coordinate was missing from the input.
    #[error("{axis} is required")]
    Missing {
        /// Which coordinate (`longitude` or `latitude`).
        axis: &'static str,
    },
    /// A coordinate string did not parse as a number.
    #[error("{axis} is not a number: {input:?}")]
    NotANumber {
        /// Which coordinate (`longitude` or `latitude`).
        axis: &'static str,
        /// The raw input.
        input: String,
    },
    /// A coordinate was NaN, infinite or outside its valid range.
    #[error("{axis} {value} is out of range")]
    OutOfRange {
        /// Which coordinate (`longitude` or `latitude`).
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// A point on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Build a point from numeric coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::OutOfRange`] if longitude is outside `[-180, 180]`,
    /// latitude is outside `[-90, 90]`, or either value is not finite.
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::OutOfRange {
                axis: "longitude",
                value: lng,
            });
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::OutOfRange {
                axis: "latitude",
                value: lat,
            });
        }
        Ok(Self { lng, lat })
    }

    /// Build a point from raw request strings.
    ///
    /// Unlike a lenient float parse, malformed input is an error rather than
    /// silently becoming `NaN` or `0`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] for missing, non-numeric or out-of-range input.
    pub fn parse(lng: Option<&str>, lat: Option<&str>) -> Result<Self, GeoError> {
        let lng = parse_axis("longitude", lng)?;
        let lat = parse_axis("latitude", lat)?;
        Self::new(lng, lat)
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Great-circle distance to `other` in metres (haversine formula).
    #[must_use]
    pub fn distance_metres(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METRES * a.sqrt().min(1.0).asin()
    }
}

fn parse_axis(axis: &'static str, raw: Option<&str>) -> Result<f64, GeoError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(GeoError::Missing { axis });
    };
    raw.parse::<f64>().map_err(|_| GeoError::NotANumber {
        axis,
        input: raw.to_owned(),
    })
}

/// A store's location: a point plus the human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Coordinates of the store.
    pub point: GeoPoint,
    /// Free-text street address.
    pub address: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_range() {
        assert!(GeoPoint::new(-79.38, 43.65).is_ok());
        assert!(GeoPoint::new(180.0, -90.0).is_ok());
        assert!(matches!(
            GeoPoint::new(181.0, 0.0),
            Err(GeoError::OutOfRange { axis: "longitude", .. })
        ));
        assert!(matches!(
            GeoPoint::new(0.0, f64::NAN),
            Err(GeoError::OutOfRange { axis: "latitude", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = GeoPoint::parse(Some("abc"), Some("43.6")).unwrap_err();
        assert_eq!(
            err,
            GeoError::NotANumber {
                axis: "longitude",
                input: "abc".to_owned()
            }
        );
        assert_eq!(
            GeoPoint::parse(Some("-79.4"), None).unwrap_err(),
            GeoError::Missing { axis: "latitude" }
        );
        assert!(GeoPoint::parse(Some("inf"), Some("1")).is_err());
    }

    #[test]
    fn test_parse_accepts_whitespace() {
        let p = GeoPoint::parse(Some(" -79.3832 "), Some("43.6532")).unwrap();
        assert!((p.lng() + 79.3832).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distance_zero() {
        let p = GeoPoint::new(-79.38, 43.65).unwrap();
        assert!(p.distance_metres(&p).abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_value() {
        // Toronto City Hall to the CN Tower is roughly 1.2 km.
        let city_hall = GeoPoint::new(-79.3841, 43.6534).unwrap();
        let cn_tower = GeoPoint::new(-79.3871, 43.6426).unwrap();
        let d = city_hall.distance_metres(&cn_tower);
        assert!((1_100.0..1_300.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        let d = a.distance_metres(&b);
        assert!((111_000.0..111_400.0).contains(&d), "got {d}");
    }
}
