//! Complete pairwise distance matrices over named points.
//!
//! Every ordered pair appears exactly once, self pairs are exactly zero and
//! the matrix is symmetric. Each unordered pair is measured once and
//! mirrored, so symmetry holds bit-for-bit regardless of the metric.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::warn;

use crate::domain::Coordinate;
use crate::precision::{PrecisionCodec, PrecisionValue};
use crate::traits::DistanceMetric;

/// One ordered pair of the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceEntry<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub distance: PrecisionValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    values: Vec<Vec<PrecisionValue>>,
}

impl DistanceMatrix {
    /// Measures every pair of `points` with `metric`, encoding with `codec`.
    ///
    /// Duplicate identifiers keep their first coordinate.
    pub fn build<M>(points: &[(String, Coordinate)], metric: &M, codec: PrecisionCodec) -> Self
    where
        M: DistanceMetric,
    {
        let mut seen = HashSet::with_capacity(points.len());
        let points: Vec<&(String, Coordinate)> = points
            .iter()
            .filter(|&point| {
                let id = point.0.as_str();
                let fresh = seen.insert(id);
                if !fresh {
                    warn!(id = %id, "duplicate point in distance matrix, keeping first");
                }
                fresh
            })
            .collect();
        let n = points.len();

        // Upper triangle only; row i holds distances to points i+1..n.
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| metric.distance(points[i].1, points[j].1))
                    .collect()
            })
            .collect();

        let zero = PrecisionValue::zero(codec.precision());
        let mut values = vec![vec![zero; n]; n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &raw) in row.iter().enumerate() {
                let j = i + 1 + offset;
                let value = codec.value(raw);
                values[i][j] = value;
                values[j][i] = value;
            }
        }

        Self {
            ids: points.iter().map(|(id, _)| id.clone()).collect(),
            values,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, from: &str, to: &str) -> Option<PrecisionValue> {
        let i = self.ids.iter().position(|id| id == from)?;
        let j = self.ids.iter().position(|id| id == to)?;
        Some(self.values[i][j])
    }

    /// All n² ordered pairs, row-major.
    pub fn entries(&self) -> impl Iterator<Item = DistanceEntry<'_>> {
        self.ids.iter().enumerate().flat_map(move |(i, from)| {
            self.ids.iter().enumerate().map(move |(j, to)| DistanceEntry {
                from,
                to,
                distance: self.values[i][j],
            })
        })
    }
}
