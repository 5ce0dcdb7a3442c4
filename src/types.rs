//! Core data types used throughout the client
//!
//! This module defines the fundamental data structures shared across the
//! system:
//!
//! # Key Types
//!
//! - **`Timestamp`**: the accepted timestamp representations (unix seconds,
//!   RFC-3339 string, or a chrono `DateTime<Utc>`)
//! - **`DurationSpec`**: the accepted duration representations (seconds or a
//!   Prometheus duration string such as `"1h30m"`)
//! - **`LabelSet`**: string-keyed, string-valued labels identifying a series
//! - **`Sample`**: a single `(timestamp, value)` measurement
//! - **`QueryValue`**: the materialized result of a query, one variant per
//!   result shape
//!
//! # Example
//!
//! ```rust
//! use promgrid::types::{DurationSpec, Timestamp};
//!
//! let ts = Timestamp::from(1700000000.0);
//! assert_eq!(ts.to_unix_seconds().unwrap(), 1700000000.0);
//!
//! let step = DurationSpec::from("1h30m");
//! assert_eq!(step.to_seconds().unwrap(), 5400.0);
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::table::{Matrix, Vector};

/// String-keyed, string-valued labels identifying a series
///
/// Ordering is irrelevant; the composite index sorts label names itself.
pub type LabelSet = HashMap<String, String>;

/// A single time-series measurement
///
/// `value` may carry IEEE-754 NaN or infinities; the query engine uses those
/// tokens for its own special values and they must survive parsing unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Unix timestamp in seconds
    pub timestamp: f64,
    /// Sample value
    pub value: f64,
}

impl Sample {
    /// Create a sample
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A timestamp in one of the accepted input representations
///
/// Anything outside these three variants is unrepresentable, so the only
/// runtime failure mode is an RFC-3339 string that does not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    /// Already a unix timestamp in seconds; passed through unchanged
    Unix(f64),
    /// RFC-3339 formatted string, e.g. `"2024-01-15T10:30:00Z"`
    Rfc3339(String),
    /// A structured date-time value
    DateTime(DateTime<Utc>),
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Timestamp::Unix(secs)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp::Rfc3339(s.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Timestamp::Rfc3339(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::DateTime(dt)
    }
}

/// A duration in one of the accepted input representations
#[derive(Debug, Clone, PartialEq)]
pub enum DurationSpec {
    /// Already a number of seconds; passed through unchanged
    Seconds(f64),
    /// Prometheus duration string, e.g. `"5m"` or `"1h30m"`
    Text(String),
    /// A structured duration value
    Std(std::time::Duration),
}

impl From<f64> for DurationSpec {
    fn from(secs: f64) -> Self {
        DurationSpec::Seconds(secs)
    }
}

impl From<u64> for DurationSpec {
    fn from(secs: u64) -> Self {
        DurationSpec::Seconds(secs as f64)
    }
}

impl From<&str> for DurationSpec {
    fn from(s: &str) -> Self {
        DurationSpec::Text(s.to_string())
    }
}

impl From<String> for DurationSpec {
    fn from(s: String) -> Self {
        DurationSpec::Text(s)
    }
}

impl From<std::time::Duration> for DurationSpec {
    fn from(d: std::time::Duration) -> Self {
        DurationSpec::Std(d)
    }
}

/// The materialized result of a query, one variant per result shape
#[derive(Debug, Clone)]
pub enum QueryValue {
    /// Range result: a dense 2-D grid indexed by time and composite labels
    Matrix(Matrix),
    /// Instant result: a 1-D array indexed by composite labels
    Vector(Vector),
    /// A single number, returned unchanged
    Scalar(f64),
    /// A single string, returned unchanged
    String(String),
}

impl QueryValue {
    /// Name of the shape this value carries, matching the wire tag
    pub fn shape(&self) -> &'static str {
        match self {
            QueryValue::Matrix(_) => "matrix",
            QueryValue::Vector(_) => "vector",
            QueryValue::Scalar(_) => "scalar",
            QueryValue::String(_) => "string",
        }
    }

    /// Extract the matrix variant, if that is what this value is
    pub fn into_matrix(self) -> Option<Matrix> {
        match self {
            QueryValue::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Extract the vector variant, if that is what this value is
    pub fn into_vector(self) -> Option<Vector> {
        match self {
            QueryValue::Vector(v) => Some(v),
            _ => None,
        }
    }
}

/// Sort key projection over a series' label set
///
/// Applied to each series before materialization; affects only row/column
/// ordering in the final table, never which cells are populated.
pub type SortKeyFn = Box<dyn Fn(&LabelSet) -> String>;
