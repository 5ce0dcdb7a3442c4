//! Materialized table types and the composite label index
//!
//! A query response materializes into either a [`Vector`] (instant query: one
//! value per series) or a [`Matrix`] (range query: a dense 2-D grid with the
//! time axis as rows and series as columns). Both are indexed by a
//! [`LabelIndex`], the composite index built from the union of label names
//! across every series in the response.
//!
//! Missing cells hold IEEE-754 NaN, never a separate presence flag, so bulk
//! numeric operations stay uniform. Tables are immutable after construction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::LabelSet;

/// Reserved label name carrying the metric name on the wire
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Index level the reserved label is remapped to, so it cannot collide with a
/// structural column name
pub const METRIC_NAME_LEVEL: &str = "metric_name";

/// Inclusive tolerance when deciding whether `end` lands on the grid
const GRID_END_EPSILON: f64 = 1e-6;

// ============================================================================
// Time grid
// ============================================================================

/// The canonical regular time axis derived from `(start, end, step)`
///
/// Holds `start, start+step, start+2*step, ...` up to and including `end`,
/// with a small tolerance so an `end` exactly on a step boundary is retained.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    start: f64,
    step: f64,
    times: Vec<f64>,
}

impl TimeGrid {
    /// Build the grid for a `(start, end, step)` window
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        let span = end - start + GRID_END_EPSILON;
        let len = if span < 0.0 || step <= 0.0 {
            0
        } else {
            (span / step).floor() as usize + 1
        };
        let times = (0..len).map(|i| start + i as f64 * step).collect();
        Self { start, step, times }
    }

    /// Map a raw sample timestamp to its nearest grid slot
    ///
    /// Pure function of `(timestamp, start, step)`: nearest-slot rounding with
    /// ties away from zero, matching the engine's own sampling grid, so
    /// re-mapping an already aligned timestamp is a no-op. Returns `None` for
    /// timestamps whose nearest slot falls outside the grid.
    pub fn slot(&self, timestamp: f64) -> Option<usize> {
        let slot = ((timestamp - self.start) / self.step).round();
        // a zero step makes the division NaN, which passes both range
        // comparisons; reject anything non-finite before the bounds check
        if !slot.is_finite() || slot < 0.0 || slot >= self.times.len() as f64 {
            return None;
        }
        Some(slot as usize)
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the grid holds no points
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The grid timestamps, in order
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Consume the grid, keeping only its timestamps
    pub fn into_times(self) -> Vec<f64> {
        self.times
    }
}

// ============================================================================
// Composite label index
// ============================================================================

/// Composite index over the label sets of all series in one response
///
/// `levels` is the sorted union of every label name seen across all series,
/// after the `__name__` remap and after merging caller-supplied extra labels.
/// Each series contributes one key tuple with `None` at every level it lacks.
/// Series order is preserved, so key `i` describes column `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelIndex {
    levels: Vec<String>,
    keys: Vec<Vec<Option<String>>>,
}

impl LabelIndex {
    /// Build the index from per-series label sets
    ///
    /// `extra` labels are merged into every series' set first, overriding
    /// same-named labels from the engine. Fails with
    /// [`Error::EmptyLabelSpace`] when no label names exist at all, since the
    /// result could not be indexed.
    pub fn build(label_sets: &[LabelSet], extra: Option<&LabelSet>) -> Result<Self> {
        let merged: Vec<LabelSet> = label_sets
            .iter()
            .map(|labels| {
                let mut merged = labels.clone();
                if let Some(extra) = extra {
                    for (k, v) in extra {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                if let Some(name) = merged.remove(METRIC_NAME_LABEL) {
                    merged.insert(METRIC_NAME_LEVEL.to_string(), name);
                }
                merged
            })
            .collect();

        let mut levels: Vec<String> = merged
            .iter()
            .flat_map(|m| m.keys().cloned())
            .collect();
        levels.sort_unstable();
        levels.dedup();

        if levels.is_empty() {
            return Err(Error::EmptyLabelSpace);
        }

        let keys = merged
            .iter()
            .map(|m| levels.iter().map(|level| m.get(level).cloned()).collect())
            .collect();

        debug!(series = merged.len(), levels = levels.len(), "built label index");
        Ok(Self { levels, keys })
    }

    /// The index level names, sorted
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Key tuples, one per series in materialization order
    pub fn keys(&self) -> &[Vec<Option<String>>] {
        &self.keys
    }

    /// Number of series in the index
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the index covers no series
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A series' value at a named level, if it has one
    pub fn label_value(&self, series: usize, level: &str) -> Option<&str> {
        let pos = self.levels.iter().position(|l| l == level)?;
        self.keys.get(series)?.get(pos)?.as_deref()
    }
}

// ============================================================================
// Materialized tables
// ============================================================================

/// Instant query result: one value per series, indexed by composite labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector {
    index: LabelIndex,
    values: Vec<f64>,
}

impl Vector {
    pub(crate) fn new(index: LabelIndex, values: Vec<f64>) -> Self {
        Self { index, values }
    }

    /// The composite label index
    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    /// Values in series order; missing values are NaN
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the result holds no series
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Range query result: a dense 2-D grid of values
///
/// Rows are the time grid, columns are series. `values[series][slot]` holds
/// the sample for the series at grid position `slot`, or NaN where the engine
/// produced no sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matrix {
    index: LabelIndex,
    times: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl Matrix {
    pub(crate) fn new(index: LabelIndex, times: Vec<f64>, values: Vec<Vec<f64>>) -> Self {
        Self { index, times, values }
    }

    /// The composite label index over the columns
    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    /// The grid timestamps, in unix seconds
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of series (columns)
    pub fn series_count(&self) -> usize {
        self.values.len()
    }

    /// Number of grid points (rows)
    pub fn grid_len(&self) -> usize {
        self.times.len()
    }

    /// All values for one series, in grid order
    pub fn column(&self, series: usize) -> Option<&[f64]> {
        self.values.get(series).map(|v| v.as_slice())
    }

    /// The value for one series at one grid slot
    pub fn value_at(&self, series: usize, slot: usize) -> Option<f64> {
        self.values.get(series)?.get(slot).copied()
    }

    /// Bit-exact comparison, NaN positions included
    ///
    /// Ordinary float equality treats NaN as unequal to itself, which would
    /// make any table with missing cells compare unequal to its own copy.
    /// Used to verify cache round-trips.
    pub fn identical(&self, other: &Matrix) -> bool {
        self.index == other.index
            && bits_eq(&self.times, &other.times)
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| bits_eq(a, b))
    }
}

fn bits_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}
