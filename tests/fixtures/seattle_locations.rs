//! Seattle relay exchange points for realistic fixtures.
//!
//! Coordinates sourced from OpenStreetMap. Neighbouring exchanges are a few
//! miles apart, which matches typical relay leg lengths.

use std::collections::BTreeMap;

use run_scheduler::domain::{Exchange, Route};
use run_scheduler::polyline::Polyline;

/// A named exchange point with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(id: &'static str, name: &'static str, lat: f64, lng: f64) -> Self {
        Self { id, name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn exchange(&self) -> Exchange {
        Exchange::new(self.id, self.name).at(self.lat, self.lng)
    }
}

pub const GAS_WORKS: Location = Location::new("gas_works", "Gas Works Park", 47.6456, -122.3344);
pub const FREMONT: Location = Location::new("fremont", "Fremont Bridge", 47.6475, -122.3497);
pub const GREEN_LAKE: Location = Location::new("green_lake", "Green Lake Bathhouse", 47.6806, -122.3400);
pub const BALLARD_LOCKS: Location = Location::new("ballard_locks", "Ballard Locks", 47.6654, -122.3972);

pub const EXCHANGES: &[Location] = &[GAS_WORKS, FREMONT, GREEN_LAKE];

pub fn exchange_map(locations: &[Location]) -> BTreeMap<String, Exchange> {
    locations
        .iter()
        .map(|location| (location.id.to_string(), location.exchange()))
        .collect()
}

/// Straight-line geometry between two locations.
pub fn line_between(from: &Location, to: &Location) -> Polyline {
    Polyline::from_lng_lat(&[vec![from.lng, from.lat], vec![to.lng, to.lat]]).unwrap()
}

/// Two routes over [`EXCHANGES`]: Gas Works to Fremont and Fremont to Green Lake.
pub fn sample_routes() -> Vec<Route> {
    vec![
        Route::new("canal", "Ship Canal Trail", GAS_WORKS.id, FREMONT.id, 3.2)
            .with_elevation(Some(40), Some(35))
            .with_geometry(line_between(&GAS_WORKS, &FREMONT)),
        Route::new("lake", "Green Lake Loop", FREMONT.id, GREEN_LAKE.id, 4.25)
            .with_elevation(Some(210), None)
            .with_geometry(line_between(&FREMONT, &GREEN_LAKE)),
    ]
}
