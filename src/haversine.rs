//! Great-circle distance over a spherical Earth.

use crate::domain::Coordinate;
use crate::traits::DistanceMetric;

/// Mean Earth radius (6371.0088 km) in statute miles.
const EARTH_RADIUS_MI: f64 = 3958.7613;

/// Haversine distance metric, in miles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl DistanceMetric for Haversine {
    fn distance(&self, from: Coordinate, to: Coordinate) -> f64 {
        haversine_miles(from, to)
    }
}

/// Calculate haversine distance between two points in miles.
pub fn haversine_miles(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_MI * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate::new(47.6, -122.3);
        assert_eq!(haversine_miles(point, point), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas to Los Angeles is ~228 miles as the crow flies
        let dist = haversine_miles(Coordinate::new(36.17, -115.14), Coordinate::new(34.05, -118.24));
        assert!(dist > 220.0 && dist < 240.0, "LV to LA should be ~228mi, got {}", dist);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree along a meridian is R * pi / 180
        let dist = haversine_miles(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        let expected = EARTH_RADIUS_MI * std::f64::consts::PI / 180.0;
        assert!((dist - expected).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = Coordinate::new(47.61, -122.33);
        let b = Coordinate::new(47.66, -122.30);
        assert_eq!(haversine_miles(a, b), haversine_miles(b, a));
    }
}
