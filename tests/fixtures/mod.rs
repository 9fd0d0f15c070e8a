//! Test fixtures for run-scheduler.
//!
//! Provides:
//! - Real Seattle relay exchange points (from OpenStreetMap)
//! - A scripted in-memory solver that replays canned models
//! - Helpers for writing route and exchange files to a temp directory

#![allow(dead_code)]

pub mod scripted_solver;
pub mod seattle_locations;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

pub use scripted_solver::*;
pub use seattle_locations::*;

/// Writes a GeoJSON route feature to `<dir>/<file>`.
pub fn write_route_file(dir: &Path, file: &str, properties: Value, line: &[(f64, f64)]) -> PathBuf {
    let coordinates: Vec<[f64; 2]> = line.iter().map(|&(lat, lng)| [lng, lat]).collect();
    let feature = json!({
        "type": "Feature",
        "properties": properties,
        "geometry": {"type": "LineString", "coordinates": coordinates},
    });
    let path = dir.join(file);
    fs::write(&path, feature.to_string()).unwrap();
    path
}

/// Writes a GeoJSON exchange registry for `locations` to `<dir>/<file>`.
pub fn write_exchange_registry(dir: &Path, file: &str, locations: &[Location]) -> PathBuf {
    let features: Vec<Value> = locations
        .iter()
        .map(|location| {
            json!({
                "type": "Feature",
                "properties": {"id": location.id, "name": location.name},
                "geometry": {"type": "Point", "coordinates": [location.lng, location.lat]},
            })
        })
        .collect();
    let path = dir.join(file);
    fs::write(&path, json!({"type": "FeatureCollection", "features": features}).to_string()).unwrap();
    path
}
