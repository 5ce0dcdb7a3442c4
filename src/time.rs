//! Timestamp and duration normalization
//!
//! Converts the heterogeneous timestamp/duration representations accepted at
//! the API surface into canonical floating-point seconds. Timestamps become
//! unix seconds since epoch; durations become a plain number of seconds,
//! parsed from the Prometheus duration grammar when given as text.
//!
//! # Duration grammar
//!
//! One or more `<integer><unit>` pairs concatenated with no separator, unit
//! in {ms, s, m, h, d, w, y}. Each pair contributes `integer * multiplier`
//! seconds and the pairs are summed, so `"1h30m"` is 5400 seconds. No
//! whitespace, no sign, no fractional counts.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{DurationSpec, Timestamp};

lazy_static! {
    /// Full-string match for the duration grammar: one or more `<int><unit>` pairs
    static ref DURATION_RE: Regex =
        Regex::new(r"^(?:\d+(?:ms|s|m|h|d|w|y))+$").expect("duration regex is valid");

    /// Extracts each `<int><unit>` pair from an already validated string
    static ref DURATION_PAIR_RE: Regex =
        Regex::new(r"(\d+)(ms|s|m|h|d|w|y)").expect("duration pair regex is valid");
}

/// Seconds multiplier for a duration unit
fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "ms" => 0.001,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        "w" => 604800.0,
        "y" => 31536000.0,
        _ => unreachable!("unit set is fixed by the regex"),
    }
}

impl Timestamp {
    /// Normalize to unix seconds since epoch
    ///
    /// Floats pass through unchanged. RFC-3339 strings parse via chrono and
    /// fail with [`Error::InvalidTimestampType`] when malformed. Structured
    /// date-times convert with sub-second precision preserved.
    pub fn to_unix_seconds(&self) -> Result<f64> {
        match self {
            Timestamp::Unix(secs) => Ok(*secs),
            Timestamp::Rfc3339(s) => {
                let dt = chrono::DateTime::parse_from_rfc3339(s).map_err(|_| {
                    Error::InvalidTimestampType { input: s.clone() }
                })?;
                Ok(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9)
            }
            Timestamp::DateTime(dt) => {
                Ok(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9)
            }
        }
    }

    /// Normalize to integer unix milliseconds, rounding half away from zero
    pub fn to_unix_millis(&self) -> Result<i64> {
        Ok((self.to_unix_seconds()? * 1000.0).round() as i64)
    }
}

impl DurationSpec {
    /// Normalize to a number of seconds
    ///
    /// Numbers pass through unchanged. Text is parsed against the duration
    /// grammar and fails with [`Error::InvalidDurationFormat`] when any part
    /// of the string falls outside it.
    pub fn to_seconds(&self) -> Result<f64> {
        match self {
            DurationSpec::Seconds(secs) => Ok(*secs),
            DurationSpec::Std(d) => Ok(d.as_secs_f64()),
            DurationSpec::Text(s) => parse_duration_text(s),
        }
    }
}

/// Parse a Prometheus duration string into seconds
fn parse_duration_text(s: &str) -> Result<f64> {
    if !DURATION_RE.is_match(s) {
        return Err(Error::InvalidDurationFormat {
            input: s.to_string(),
        });
    }

    let mut seconds = 0.0;
    for cap in DURATION_PAIR_RE.captures_iter(s) {
        let count: f64 = cap[1].parse().map_err(|_| Error::InvalidDurationFormat {
            input: s.to_string(),
        })?;
        seconds += count * unit_multiplier(&cap[2]);
    }
    Ok(seconds)
}
