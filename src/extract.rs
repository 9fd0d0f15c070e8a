//! Reads a schedule, cost labels and a fingerprint out of a solver model.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xxhash_rust::xxh64::xxh64;

use crate::facts::{self, FactSet};
use crate::precision::PrecisionCodec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("day {day} slot {slot} assigns unknown route {route}")]
    UnknownRoute { day: i64, slot: i64, route: String },

    #[error("route {0} has no distance fact")]
    MissingDistance(String),
}

/// One route assigned to a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledRoute {
    pub slot: i64,
    pub route_id: String,
    pub name: String,
    pub start_exchange: String,
    pub end_exchange: String,
    pub distance_mi: f64,
}

/// All routes assigned to one day, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: i64,
    pub routes: Vec<ScheduledRoute>,
    /// Allowed (lower, upper) total distance for the day, when configured.
    pub distance_range: Option<(f64, f64)>,
}

impl DaySchedule {
    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(|route| route.distance_mi).sum()
    }
}

struct RouteInfo<'a> {
    name: &'a str,
    start: &'a str,
    end: &'a str,
}

/// Groups `slotAssignment` facts by day and joins them against route facts.
///
/// Days are returned in ascending order, routes within a day by slot.
/// Distances are decoded with `codec`, so they carry the encoding's upward
/// rounding.
pub fn extract_schedule(
    facts: &FactSet,
    codec: &PrecisionCodec,
) -> Result<Vec<DaySchedule>, ExtractError> {
    let routes: HashMap<&str, RouteInfo<'_>> = facts
        .named(facts::ROUTE, 4)
        .filter_map(|fact| {
            Some((
                fact.text(0)?,
                RouteInfo {
                    name: fact.text(1)?,
                    start: fact.text(2)?,
                    end: fact.text(3)?,
                },
            ))
        })
        .collect();
    let distances: HashMap<&str, i64> = facts
        .named(facts::ROUTE_DISTANCE, 2)
        .filter_map(|fact| Some((fact.text(0)?, fact.int(1)?)))
        .collect();
    let ranges: HashMap<i64, (f64, f64)> = facts
        .named(facts::DAY_DIST_RANGE, 3)
        .filter_map(|fact| {
            Some((
                fact.int(0)?,
                (codec.decode(fact.int(1)?), codec.decode(fact.int(2)?)),
            ))
        })
        .collect();

    let mut days: BTreeMap<i64, Vec<(i64, &str)>> = BTreeMap::new();
    for fact in facts.named(facts::SLOT_ASSIGNMENT, 3) {
        if let (Some(day), Some(slot), Some(route)) = (fact.int(0), fact.int(1), fact.text(2)) {
            days.entry(day).or_default().push((slot, route));
        }
    }

    let mut schedule = Vec::with_capacity(days.len());
    for (day, mut slots) in days {
        slots.sort();
        let mut routes_for_day = Vec::with_capacity(slots.len());
        for (slot, route_id) in slots {
            let info = routes.get(route_id).ok_or_else(|| ExtractError::UnknownRoute {
                day,
                slot,
                route: route_id.to_string(),
            })?;
            let encoded = distances
                .get(route_id)
                .ok_or_else(|| ExtractError::MissingDistance(route_id.to_string()))?;
            routes_for_day.push(ScheduledRoute {
                slot,
                route_id: route_id.to_string(),
                name: info.name.to_string(),
                start_exchange: info.start.to_string(),
                end_exchange: info.end.to_string(),
                distance_mi: codec.decode(*encoded),
            });
        }
        schedule.push(DaySchedule {
            day,
            routes: routes_for_day,
            distance_range: ranges.get(&day).copied(),
        });
    }
    Ok(schedule)
}

/// Names each cost vector entry after its `objective(index, name)` label.
///
/// Labels are taken in descending index order and matched positionally with
/// the cost vector; the solver reports higher priority levels first.
pub fn label_costs(facts: &FactSet, cost: &[i64]) -> BTreeMap<String, i64> {
    let mut labels: Vec<(i64, &str)> = facts
        .named(facts::OBJECTIVE, 2)
        .filter_map(|fact| Some((fact.int(0)?, fact.text(1)?)))
        .collect();
    labels.sort_by(|a, b| b.cmp(a));

    labels
        .into_iter()
        .zip(cost)
        .map(|((_, name), value)| (name.to_string(), *value))
        .collect()
}

/// Fast content digest of a model's facts.
///
/// Only comparable between runs of the same build and configuration; this
/// is not a cryptographic commitment.
pub fn fingerprint(facts: &FactSet) -> String {
    format!("{:016x}", xxh64(facts.to_program().as_bytes(), 0))
}
