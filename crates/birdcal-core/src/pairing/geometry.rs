//! Flat-earth geometry for survey footprints.
//!
//! Survey areas are a few hundred metres across, so degrees are converted to
//! metres with a local equirectangular approximation.

use serde::{Deserialize, Serialize};

/// Metres per degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Floor on `cos(lat)` so longitude scaling stays finite near the poles.
const MIN_LON_SCALE: f64 = 0.1;

pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

pub fn meters_to_lon_degrees(meters: f64, lat: f64) -> f64 {
    meters / meters_per_lon_degree(lat)
}

fn meters_per_lon_degree(lat: f64) -> f64 {
    METERS_PER_DEGREE * lat.to_radians().cos().max(MIN_LON_SCALE)
}

/// Axis-aligned lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Smallest box containing every `(lat, lon)` corner; `None` if empty.
    pub fn from_corners(corners: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = corners.into_iter();
        let (lat, lon) = iter.next()?;
        let mut b = Bounds {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        };
        for (lat, lon) in iter {
            b.min_lat = b.min_lat.min(lat);
            b.max_lat = b.max_lat.max(lat);
            b.min_lon = b.min_lon.min(lon);
            b.max_lon = b.max_lon.max(lon);
        }
        Some(b)
    }

    /// Whether `(lat, lon)` lies inside the box grown by `buffer_meters`.
    ///
    /// The longitude buffer is scaled at the point's own latitude.
    pub fn contains_with_buffer(&self, lat: f64, lon: f64, buffer_meters: f64) -> bool {
        let d_lat = meters_to_lat_degrees(buffer_meters);
        let d_lon = meters_to_lon_degrees(buffer_meters, lat);
        (self.min_lat - d_lat..=self.max_lat + d_lat).contains(&lat)
            && (self.min_lon - d_lon..=self.max_lon + d_lon).contains(&lon)
    }

    /// Footprint area in hectares, scaled at the mean latitude.
    pub fn area_hectares(&self) -> f64 {
        let lat_span = (self.max_lat - self.min_lat).max(0.0);
        let lon_span = (self.max_lon - self.min_lon).max(0.0);
        let mean_lat = (self.max_lat + self.min_lat) / 2.0;
        let area_m2 = (lat_span * METERS_PER_DEGREE) * (lon_span * meters_per_lon_degree(mean_lat));
        area_m2 / 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_degree_conversions() {
        assert!(approx_eq(meters_to_lat_degrees(111_320.0), 1.0, 1e-12));
        assert!(approx_eq(meters_to_lon_degrees(111_320.0, 0.0), 1.0, 1e-12));
        assert!(approx_eq(meters_to_lon_degrees(111_320.0, 60.0), 2.0, 1e-9));
        // Clamped near the pole.
        assert!(approx_eq(meters_to_lon_degrees(11_132.0, 89.9), 1.0, 1e-9));
    }

    #[test]
    fn test_bounds_and_area() {
        let b = Bounds::from_corners([(0.0, 0.0), (0.001, 0.002), (0.0005, -0.001)]).unwrap();
        assert_eq!(b.min_lon, -0.001);
        assert_eq!(b.max_lon, 0.002);
        // 111.32 m x 333.96 m at the equator.
        let expected = 0.001 * 111_320.0 * 0.003 * 111_320.0 / 10_000.0;
        assert!(approx_eq(b.area_hectares(), expected, 1e-6));
        assert!(Bounds::from_corners(std::iter::empty()).is_none());
    }

    #[test]
    fn test_degenerate_bounds_have_zero_area() {
        let b = Bounds::from_corners([(10.0, 10.0)]).unwrap();
        assert_eq!(b.area_hectares(), 0.0);
    }

    #[test]
    fn test_buffer_containment() {
        let b = Bounds::from_corners([(0.0, 0.0), (0.001, 0.001)]).unwrap();
        assert!(b.contains_with_buffer(0.0005, 0.0005, 0.0));
        // ~111 m north of the box.
        assert!(!b.contains_with_buffer(0.002, 0.0005, 50.0));
        assert!(b.contains_with_buffer(0.002, 0.0005, 150.0));
    }
}
