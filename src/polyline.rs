//! Polyline representation for route geometries.
//!
//! Vertices are held as (lat, lng) coordinates. Source formats that store
//! `[lng, lat, ele]` arrays are flipped once, at the boundary, by
//! [`Polyline::from_lng_lat`].

use serde::{Deserialize, Serialize};

use crate::domain::Coordinate;

/// Ordered vertex sequence of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Builds a polyline from GeoJSON position arrays (`[lng, lat, ele?]`).
    ///
    /// Returns `None` if any position has fewer than two components.
    pub fn from_lng_lat(positions: &[Vec<f64>]) -> Option<Self> {
        positions
            .iter()
            .map(|position| match position.as_slice() {
                [lng, lat, ..] => Some(Coordinate::from_lng_lat(*lng, *lat)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    /// Arithmetic mean of the vertex latitudes and longitudes.
    ///
    /// This is a planar approximation, good enough at city scale.
    pub fn centroid(&self) -> Option<Coordinate> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (lat_sum, lng_sum) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(lat, lng), point| (lat + point.lat, lng + point.lng));
        Some(Coordinate::new(lat_sum / n, lng_sum / n))
    }
}
