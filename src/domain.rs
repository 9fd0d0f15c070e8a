//! Normalised exchange and route records.

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;

/// Geographic point in degrees, always stored as (lat, lng).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from GeoJSON's `[lng, lat, ...]` ordering.
    pub fn from_lng_lat(lng: f64, lat: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Value of a free-form attribute attached to a route or exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Text(String),
    IntegerList(Vec<i64>),
    TextList(Vec<String>),
}

impl AttributeValue {
    /// Empty strings and empty lists carry no information.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Integer(_) => false,
            AttributeValue::Text(text) => text.is_empty(),
            AttributeValue::IntegerList(values) => values.is_empty(),
            AttributeValue::TextList(values) => values.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, AttributeValue::Text(value.into()))
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, AttributeValue::Integer(value))
    }

    pub fn text_list<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            AttributeValue::TextList(values.into_iter().map(Into::into).collect()),
        )
    }
}

/// Name of the attribute holding a route's historical run dates.
pub const DATES_RUN: &str = "dates_run";

/// A named waypoint where legs begin or end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub name: String,
    /// Registries in tabular form may not carry coordinates.
    pub coordinate: Option<Coordinate>,
    pub attributes: Vec<Attribute>,
}

impl Exchange {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate: None,
            attributes: Vec::new(),
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.coordinate = Some(Coordinate::new(lat, lng));
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A single point-to-point leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub start_exchange: String,
    pub end_exchange: String,
    pub distance_mi: f64,
    pub ascent: Option<u32>,
    pub descent: Option<u32>,
    pub deprecated: bool,
    pub geometry: Polyline,
    pub attributes: Vec<Attribute>,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_exchange: impl Into<String>,
        end_exchange: impl Into<String>,
        distance_mi: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_exchange: start_exchange.into(),
            end_exchange: end_exchange.into(),
            distance_mi,
            ascent: None,
            descent: None,
            deprecated: false,
            geometry: Polyline::default(),
            attributes: Vec::new(),
        }
    }

    pub fn with_elevation(mut self, ascent: Option<u32>, descent: Option<u32>) -> Self {
        self.ascent = ascent;
        self.descent = descent;
        self
    }

    pub fn with_geometry(mut self, geometry: Polyline) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| &attribute.value)
    }

    /// Historical run dates in recorded order; empty when never run.
    pub fn dates_run(&self) -> &[String] {
        match self.attribute(DATES_RUN) {
            Some(AttributeValue::TextList(dates)) => dates,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lng_lat_flips_order() {
        let coordinate = Coordinate::from_lng_lat(-122.33, 47.61);
        assert_eq!(coordinate.lat, 47.61);
        assert_eq!(coordinate.lng, -122.33);
    }

    #[test]
    fn test_attribute_emptiness() {
        assert!(AttributeValue::Text(String::new()).is_empty());
        assert!(AttributeValue::TextList(vec![]).is_empty());
        assert!(!AttributeValue::Integer(0).is_empty());
        assert!(!AttributeValue::IntegerList(vec![1]).is_empty());
    }

    #[test]
    fn test_dates_run_lookup() {
        let route = Route::new("r1", "Leg 1", "a", "b", 3.0)
            .with_attribute(Attribute::text_list(DATES_RUN, ["2020-01-01", "2021-01-01"]));
        assert_eq!(route.dates_run(), ["2020-01-01", "2021-01-01"]);

        let never_run = Route::new("r2", "Leg 2", "a", "b", 3.0);
        assert!(never_run.dates_run().is_empty());
    }
}
