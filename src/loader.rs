//! Loads exchanges and routes from GeoJSON, CSV and YAML sources.
//!
//! Everything is normalised on the way in: coordinates become (lat, lng),
//! elevation sentinels become `None`, list attributes get their singular fact
//! names, and deprecated routes are dropped.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Attribute, AttributeValue, Coordinate, DATES_RUN, Exchange, Route};
use crate::polyline::Polyline;

/// What to do with a record that is missing required fields or is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Log a warning and keep loading the remaining records.
    #[default]
    Skip,
    /// Fail the whole load on the first bad record.
    Abort,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("bad record {record}: {reason}")]
    Record { record: String, reason: String },

    #[error("unsupported exchange registry format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl LoadError {
    fn record(record: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::Record {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Number, or string, as found in loosely typed source files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn to_text(&self) -> String {
        match self {
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Text(value) => value.clone(),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            Scalar::Text(value) => value.trim().parse().ok(),
        }
    }

    /// Elevation in whole units; negative values are the "unknown" sentinel.
    fn to_elevation(&self) -> Option<Option<u32>> {
        let value = self.to_f64()?;
        if !value.is_finite() {
            return None;
        }
        if value < 0.0 {
            return Some(None);
        }
        Some(Some(value.round() as u32))
    }
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    properties: RouteRecord,
    geometry: Option<LineString>,
}

#[derive(Debug, Deserialize)]
struct RouteRecord {
    id: Option<Scalar>,
    name: Option<String>,
    #[serde(alias = "dist")]
    distance_mi: Option<Scalar>,
    #[serde(alias = "ascent_m", alias = "ascent_ft", alias = "up")]
    ascent: Option<Scalar>,
    #[serde(alias = "descent_m", alias = "descent_ft", alias = "down")]
    descent: Option<Scalar>,
    start: Option<Scalar>,
    end: Option<Scalar>,
    deprecated: Option<Value>,
    // A key present with no value (`dates_run:` in YAML) reads as null.
    #[serde(default)]
    neighborhoods: Option<Vec<String>>,
    #[serde(default)]
    coarse_neighborhoods: Option<Vec<String>>,
    #[serde(default)]
    dates_run: Option<Vec<String>>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl RouteRecord {
    fn into_route(self, record: &str, geometry: Polyline) -> Result<Route, LoadError> {
        let missing = |field: &str| LoadError::record(record, format!("missing {}", field));

        let id = self.id.ok_or_else(|| missing("id"))?.to_text();
        let name = self.name.ok_or_else(|| missing("name"))?;
        let start = self.start.ok_or_else(|| missing("start"))?.to_text();
        let end = self.end.ok_or_else(|| missing("end"))?.to_text();
        let distance_mi = self
            .distance_mi
            .ok_or_else(|| missing("distance_mi"))?
            .to_f64()
            .filter(|distance| distance.is_finite() && *distance >= 0.0)
            .ok_or_else(|| LoadError::record(record, "distance is not a non-negative number"))?;
        let ascent = match &self.ascent {
            Some(value) => value
                .to_elevation()
                .ok_or_else(|| LoadError::record(record, "ascent is not a number"))?,
            None => None,
        };
        let descent = match &self.descent {
            Some(value) => value
                .to_elevation()
                .ok_or_else(|| LoadError::record(record, "descent is not a number"))?,
            None => None,
        };

        let mut route = Route::new(id, name, start, end, distance_mi)
            .with_elevation(ascent, descent)
            .with_geometry(geometry);
        route.deprecated = self.deprecated.as_ref().is_some_and(is_truthy);

        for (name, value) in self.extra {
            if let Some(value) = attribute_value(&value) {
                route.attributes.push(Attribute::new(name, value));
            }
        }
        let neighborhoods = self.neighborhoods.unwrap_or_default();
        if !neighborhoods.is_empty() {
            route
                .attributes
                .push(Attribute::text_list("neighborhood", neighborhoods));
        }
        let coarse_neighborhoods = self.coarse_neighborhoods.unwrap_or_default();
        if !coarse_neighborhoods.is_empty() {
            route.attributes.push(Attribute::text_list(
                "coarse_neighborhood",
                coarse_neighborhoods,
            ));
        }
        route.attributes.push(Attribute::text_list(
            DATES_RUN,
            self.dates_run.unwrap_or_default(),
        ));
        Ok(route)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Converts a free-form property into an attribute value, if it has a shape
/// the solver can reason about.
fn attribute_value(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::String(text) => Some(AttributeValue::Text(text.clone())),
        Value::Number(number) => number.as_i64().map(AttributeValue::Integer),
        Value::Array(items) if items.iter().all(Value::is_string) => Some(AttributeValue::TextList(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )),
        Value::Array(items) if items.iter().all(Value::is_i64) => Some(AttributeValue::IntegerList(
            items.iter().filter_map(Value::as_i64).collect(),
        )),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PointFeature {
    properties: serde_json::Map<String, Value>,
    geometry: Option<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    coordinates: Vec<f64>,
}

/// Loads exchange registries and route records under a [`LoadPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoDataLoader {
    policy: LoadPolicy,
}

impl GeoDataLoader {
    pub fn new(policy: LoadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    fn tolerate(&self, err: LoadError) -> Result<(), LoadError> {
        match self.policy {
            LoadPolicy::Skip => {
                warn!(error = %err, "skipping record");
                Ok(())
            }
            LoadPolicy::Abort => Err(err),
        }
    }

    /// Loads an exchange registry, choosing the parser by file extension
    /// (`.geojson`/`.json` or `.csv`).
    pub fn load_exchanges(&self, path: &Path) -> Result<BTreeMap<String, Exchange>, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let exchanges = match extension.as_deref() {
            Some("geojson") | Some("json") => self.load_exchanges_geojson(path)?,
            Some("csv") => self.load_exchanges_csv(path)?,
            _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        };
        info!(path = %path.display(), count = exchanges.len(), "loaded exchanges");
        Ok(exchanges)
    }

    fn load_exchanges_geojson(&self, path: &Path) -> Result<BTreeMap<String, Exchange>, LoadError> {
        let text = read(path)?;
        let collection: FeatureCollection =
            serde_json::from_str(&text).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut exchanges = BTreeMap::new();
        for (index, feature) in collection.features.into_iter().enumerate() {
            let record = format!("{}#{}", path.display(), index);
            match exchange_from_feature(&record, feature) {
                Ok(exchange) => self.insert_exchange(&mut exchanges, exchange)?,
                Err(err) => self.tolerate(err)?,
            }
        }
        Ok(exchanges)
    }

    fn load_exchanges_csv(&self, path: &Path) -> Result<BTreeMap<String, Exchange>, LoadError> {
        let csv_error = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;

        let mut exchanges = BTreeMap::new();
        for (index, row) in reader.deserialize::<BTreeMap<String, String>>().enumerate() {
            let record = format!("{}:{}", path.display(), index + 2);
            let parsed = row
                .map_err(|source| LoadError::record(&record, source.to_string()))
                .and_then(|row| exchange_from_row(&record, row));
            match parsed {
                Ok(exchange) => self.insert_exchange(&mut exchanges, exchange)?,
                Err(err) => self.tolerate(err)?,
            }
        }
        Ok(exchanges)
    }

    fn insert_exchange(
        &self,
        exchanges: &mut BTreeMap<String, Exchange>,
        exchange: Exchange,
    ) -> Result<(), LoadError> {
        if exchanges.contains_key(&exchange.id) {
            return self.tolerate(LoadError::record(
                &exchange.id,
                "duplicate exchange id",
            ));
        }
        exchanges.insert(exchange.id.clone(), exchange);
        Ok(())
    }

    /// Loads every `*.geojson` route file in `dir`, in file-name order.
    pub fn load_routes_from_dir(&self, dir: &Path) -> Result<Vec<Route>, LoadError> {
        let io_error = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("geojson") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut routes = Vec::with_capacity(paths.len());
        let mut seen = HashSet::new();
        for path in &paths {
            match load_route_file(path) {
                Ok(route) => self.push_route(&mut routes, &mut seen, route)?,
                Err(err) => self.tolerate(err)?,
            }
        }
        info!(dir = %dir.display(), files = paths.len(), routes = routes.len(), "loaded routes");
        Ok(routes)
    }

    /// Loads routes from a YAML list of route records (no geometry).
    pub fn load_routes_from_table(&self, path: &Path) -> Result<Vec<Route>, LoadError> {
        let text = read(path)?;
        let records: Vec<Value> = serde_yaml::from_str(&text).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut routes = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        for (index, value) in records.into_iter().enumerate() {
            let record = format!("{}#{}", path.display(), index);
            let parsed = serde_json::from_value::<RouteRecord>(value)
                .map_err(|source| LoadError::record(&record, source.to_string()))
                .and_then(|props| props.into_route(&record, Polyline::default()));
            match parsed {
                Ok(route) => self.push_route(&mut routes, &mut seen, route)?,
                Err(err) => self.tolerate(err)?,
            }
        }
        info!(path = %path.display(), routes = routes.len(), "loaded route table");
        Ok(routes)
    }

    fn push_route(
        &self,
        routes: &mut Vec<Route>,
        seen: &mut HashSet<String>,
        route: Route,
    ) -> Result<(), LoadError> {
        if route.deprecated {
            debug!(route = %route.id, "dropping deprecated route");
            return Ok(());
        }
        if !seen.insert(route.id.clone()) {
            return self.tolerate(LoadError::record(&route.id, "duplicate route id"));
        }
        routes.push(route);
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_route_file(path: &Path) -> Result<Route, LoadError> {
    let record = path.display().to_string();
    let text = read(path)?;
    let feature: RouteFeature = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let geometry = match &feature.geometry {
        Some(line) => Polyline::from_lng_lat(&line.coordinates)
            .ok_or_else(|| LoadError::record(&record, "coordinate with fewer than two components"))?,
        None => Polyline::default(),
    };
    feature.properties.into_route(&record, geometry)
}

fn exchange_from_feature(record: &str, feature: Value) -> Result<Exchange, LoadError> {
    let feature: PointFeature = serde_json::from_value(feature)
        .map_err(|source| LoadError::record(record, source.to_string()))?;
    let mut properties = feature.properties;

    let id = match properties.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(LoadError::record(record, "missing id")),
    };
    let name = match properties.remove("name") {
        Some(Value::String(name)) => name,
        _ => return Err(LoadError::record(record, "missing name")),
    };

    let mut exchange = Exchange::new(id, name);
    if let Some(point) = feature.geometry {
        exchange.coordinate = match point.coordinates.as_slice() {
            [lng, lat, ..] => Some(Coordinate::from_lng_lat(*lng, *lat)),
            _ => return Err(LoadError::record(record, "point with fewer than two components")),
        };
    }
    for (name, value) in properties {
        if let Some(value) = attribute_value(&value) {
            exchange.attributes.push(Attribute::new(name, value));
        }
    }
    Ok(exchange)
}

fn exchange_from_row(record: &str, mut row: BTreeMap<String, String>) -> Result<Exchange, LoadError> {
    let id = row
        .remove("id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| LoadError::record(record, "missing id"))?;
    let name = row
        .remove("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| LoadError::record(record, "missing name"))?;

    let lat = take_number(&mut row, &["lat", "latitude"], record)?;
    let lng = take_number(&mut row, &["lng", "lon", "long", "longitude"], record)?;

    let mut exchange = Exchange::new(id, name);
    exchange.coordinate = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        (None, None) => None,
        _ => return Err(LoadError::record(record, "only one of lat/lng given")),
    };
    for (name, value) in row {
        if !value.is_empty() {
            exchange.attributes.push(Attribute::text(name, value));
        }
    }
    Ok(exchange)
}

fn take_number(
    row: &mut BTreeMap<String, String>,
    columns: &[&str],
    record: &str,
) -> Result<Option<f64>, LoadError> {
    for column in columns {
        if let Some(text) = row.remove(*column) {
            if text.trim().is_empty() {
                return Ok(None);
            }
            return text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| LoadError::record(record, format!("{} is not a number", column)));
        }
    }
    Ok(None)
}
