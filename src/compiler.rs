//! Compiles loaded routes and exchanges into the solver's fact base.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Attribute, AttributeValue, Coordinate, Exchange, Route};
use crate::facts::{self, Fact, FactSet, Term};
use crate::haversine::Haversine;
use crate::matrix::DistanceMatrix;
use crate::precision::{CodecCache, PrecisionPair};
use crate::traits::DistanceMetric;

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("route {route} references unknown exchange {exchange}")]
    UnknownExchange { route: String, exchange: String },

    #[error("route {route} has invalid distance {distance}")]
    InvalidDistance { route: String, distance: f64 },
}

/// Turns [`Route`]s and [`Exchange`]s into a [`FactSet`].
///
/// Compilation is deterministic: the same input always produces the same
/// fact set, which the model fingerprint relies on.
#[derive(Debug)]
pub struct FactCompiler<M = Haversine> {
    precision: PrecisionPair,
    codecs: CodecCache,
    metric: M,
}

impl FactCompiler<Haversine> {
    pub fn new(precision: PrecisionPair) -> Self {
        Self::with_metric(precision, Haversine)
    }
}

impl<M> FactCompiler<M>
where
    M: DistanceMetric,
{
    pub fn with_metric(precision: PrecisionPair, metric: M) -> Self {
        Self {
            precision,
            codecs: CodecCache::new(),
            metric,
        }
    }

    pub fn precision(&self) -> PrecisionPair {
        self.precision
    }

    pub fn compile(
        &mut self,
        routes: &[Route],
        exchanges: &BTreeMap<String, Exchange>,
    ) -> Result<FactSet, CompileError> {
        let routes: Vec<&Route> = routes.iter().filter(|route| !route.deprecated).collect();
        validate(&routes, exchanges)?;

        let distance_codec = self.codecs.get(self.precision.distance);
        let mut out = FactSet::new();

        for route in &routes {
            out.insert(facts::route(
                &route.id,
                &route.name,
                &route.start_exchange,
                &route.end_exchange,
            ));
            out.insert(facts::route_distance(&route.id, route.distance_mi, &distance_codec));
            if let Some(ascent) = route.ascent {
                out.insert(facts::ascent(&route.id, ascent));
            }
            if let Some(descent) = route.descent {
                out.insert(facts::descent(&route.id, descent));
            }
            out.extend(attribute_facts(&route.id, &route.attributes));
        }

        for exchange in exchanges.values() {
            out.insert(facts::exchange(&exchange.id, &exchange.name));
            out.extend(attribute_facts(&exchange.id, &exchange.attributes));
        }

        for (route_id, rank) in recency_ranks(&routes) {
            out.insert(facts::last_run(route_id, rank));
        }

        let centroids: Vec<(String, Coordinate)> = routes
            .iter()
            .filter_map(|route| match route.geometry.centroid() {
                Some(centroid) => Some((route.id.clone(), centroid)),
                None => {
                    debug!(route = %route.id, "route has no geometry, left out of pair distances");
                    None
                }
            })
            .collect();
        let route_matrix = DistanceMatrix::build(&centroids, &self.metric, distance_codec);
        for entry in route_matrix.entries() {
            out.insert(facts::route_pair_distance(
                entry.from,
                entry.to,
                entry.distance.encoded,
            ));
        }

        let exchange_points = exchange_coordinates(&routes, exchanges);
        let exchange_matrix = DistanceMatrix::build(&exchange_points, &self.metric, distance_codec);
        for entry in exchange_matrix.entries() {
            out.insert(facts::exchange_pair_distance(
                entry.from,
                entry.to,
                entry.distance.encoded,
            ));
        }

        out.insert(facts::distance_precision(self.precision.distance));
        out.insert(facts::duration_precision(self.precision.duration));

        info!(
            routes = routes.len(),
            exchanges = exchanges.len(),
            facts = out.len(),
            "compiled fact base"
        );
        Ok(out)
    }
}

fn validate(routes: &[&Route], exchanges: &BTreeMap<String, Exchange>) -> Result<(), CompileError> {
    for route in routes {
        for exchange in [&route.start_exchange, &route.end_exchange] {
            if !exchanges.contains_key(exchange) {
                return Err(CompileError::UnknownExchange {
                    route: route.id.clone(),
                    exchange: exchange.clone(),
                });
            }
        }
        if !route.distance_mi.is_finite() || route.distance_mi < 0.0 {
            return Err(CompileError::InvalidDistance {
                route: route.id.clone(),
                distance: route.distance_mi,
            });
        }
    }
    Ok(())
}

/// Explodes attributes into `tag(entity, value)` facts, one per list element.
pub fn attribute_facts(entity: &str, attributes: &[Attribute]) -> Vec<Fact> {
    let mut out = Vec::new();
    for attribute in attributes {
        if attribute.value.is_empty() {
            continue;
        }
        let tag = fact_tag(&attribute.name);
        if !facts::is_predicate_name(&tag) {
            warn!(entity, attribute = %attribute.name, "attribute name is not a valid predicate, skipped");
            continue;
        }
        match &attribute.value {
            AttributeValue::Integer(value) => {
                out.push(facts::attribute(&tag, entity, Term::Int(*value)));
            }
            AttributeValue::Text(value) => {
                out.push(facts::attribute(&tag, entity, Term::from(value.as_str())));
            }
            AttributeValue::IntegerList(values) => {
                out.extend(
                    values
                        .iter()
                        .map(|value| facts::attribute(&tag, entity, Term::Int(*value))),
                );
            }
            AttributeValue::TextList(values) => {
                out.extend(
                    values
                        .iter()
                        .map(|value| facts::attribute(&tag, entity, Term::from(value.as_str()))),
                );
            }
        }
    }
    out
}

/// Converts an attribute name such as `coarse_neighborhood` into a predicate
/// name (`coarseNeighborhood`). Every non-alphanumeric character acts as a
/// word break.
pub fn fact_tag(name: &str) -> String {
    let mut tag = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            upper_next = !tag.is_empty();
        } else if upper_next {
            tag.extend(c.to_uppercase());
            upper_next = false;
        } else if tag.is_empty() {
            tag.extend(c.to_lowercase());
        } else {
            tag.push(c);
        }
    }
    tag
}

/// Ranks each route by the position of its most recent run date among all
/// distinct dates in the corpus; `-1` for routes never run.
///
/// The last entry of a route's history is taken as its most recent run.
pub fn recency_ranks<'a>(routes: &[&'a Route]) -> Vec<(&'a str, i64)> {
    let all_dates: Vec<&str> = routes
        .iter()
        .flat_map(|&route| route.dates_run().iter().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    routes
        .iter()
        .map(|&route| {
            let rank = route
                .dates_run()
                .last()
                .and_then(|last| all_dates.binary_search(&last.as_str()).ok())
                .map_or(-1, |index| index as i64);
            (route.id.as_str(), rank)
        })
        .collect()
}

/// Exchange coordinates, falling back to route endpoints for exchanges whose
/// registry entry has no coordinate.
fn exchange_coordinates(
    routes: &[&Route],
    exchanges: &BTreeMap<String, Exchange>,
) -> Vec<(String, Coordinate)> {
    let mut inferred: BTreeMap<&str, Coordinate> = BTreeMap::new();
    for route in routes {
        if let Some(first) = route.geometry.first() {
            inferred.entry(route.start_exchange.as_str()).or_insert(first);
        }
        if let Some(last) = route.geometry.last() {
            inferred.entry(route.end_exchange.as_str()).or_insert(last);
        }
    }

    exchanges
        .values()
        .filter_map(|exchange| {
            exchange
                .coordinate
                .or_else(|| inferred.get(exchange.id.as_str()).copied())
                .map(|coordinate| (exchange.id.clone(), coordinate))
        })
        .collect()
}
