//! Result classification and materialization
//!
//! Turns a decoded [`ResultPayload`] into a [`QueryValue`]: scalar and string
//! shapes pass through, vector and matrix shapes materialize into dense
//! NaN-prefilled buffers plus a composite label index.
//!
//! Matrix materialization aligns each series' irregular samples onto the
//! canonical [`TimeGrid`] by nearest-slot rounding. The engine produces
//! samples on a grid congruent to the requested `(start, step)`, so rounding
//! only has to absorb floating-point jitter in the engine's own timestamps;
//! a sample whose nearest slot falls outside the window is dropped.

use tracing::debug;

use crate::error::{Error, Result};
use crate::response::{MatrixResult, ResultPayload, VectorResult};
use crate::table::{LabelIndex, Matrix, TimeGrid, Vector};
use crate::types::{LabelSet, QueryValue, Sample, SortKeyFn};

/// Materialize a decoded payload into its table form
///
/// `grid` must be supplied for range queries and is what a matrix payload is
/// aligned to; a matrix arriving without one (an instant query that evaluated
/// a range selector) cannot be gridded and is rejected. `extra_labels` merge
/// into every series' label set, overriding same-named engine labels. `sort`
/// pre-sorts the per-series records by a projection of their label sets,
/// which affects only row/column order in the result, never cell population.
pub fn materialize(
    payload: ResultPayload,
    grid: Option<&TimeGrid>,
    extra_labels: Option<&LabelSet>,
    sort: Option<&SortKeyFn>,
) -> Result<QueryValue> {
    match payload {
        ResultPayload::Scalar((_, value)) => Ok(QueryValue::Scalar(parse_value(&value)?)),
        ResultPayload::String((_, value)) => Ok(QueryValue::String(value)),
        ResultPayload::Vector(mut series) => {
            if let Some(key) = sort {
                series.sort_by_cached_key(|r| key(&r.metric));
            }
            let (values, metrics) = vector_to_buffer(&series)?;
            let index = LabelIndex::build(&metrics, extra_labels)?;
            Ok(QueryValue::Vector(Vector::new(index, values)))
        }
        ResultPayload::Matrix(mut series) => {
            let grid = grid.ok_or(Error::UnexpectedResultShape {
                expected: "vector, scalar, or string",
                got: "matrix",
            })?;
            if let Some(key) = sort {
                series.sort_by_cached_key(|r| key(&r.metric));
            }
            let (values, metrics) = matrix_to_buffer(&series, grid)?;
            let index = LabelIndex::build(&metrics, extra_labels)?;
            Ok(QueryValue::Matrix(Matrix::new(
                index,
                grid.times().to_vec(),
                values,
            )))
        }
    }
}

/// Vector materializer: one NaN-prefilled slot per series, in input order
fn vector_to_buffer(series: &[VectorResult]) -> Result<(Vec<f64>, Vec<LabelSet>)> {
    let mut values = vec![f64::NAN; series.len()];
    let mut metrics = Vec::with_capacity(series.len());

    for (i, record) in series.iter().enumerate() {
        values[i] = parse_value(&record.value.1)?;
        metrics.push(record.metric.clone());
    }

    Ok((values, metrics))
}

/// Matrix materializer: NaN-prefilled `[series][grid_len]` buffer with each
/// raw sample written to its nearest grid slot
fn matrix_to_buffer(
    series: &[MatrixResult],
    grid: &TimeGrid,
) -> Result<(Vec<Vec<f64>>, Vec<LabelSet>)> {
    let mut values = vec![vec![f64::NAN; grid.len()]; series.len()];
    let mut metrics = Vec::with_capacity(series.len());

    for (i, record) in series.iter().enumerate() {
        for (timestamp, value) in &record.values {
            let sample = Sample::new(*timestamp, parse_value(value)?);
            match grid.slot(sample.timestamp) {
                Some(slot) => values[i][slot] = sample.value,
                None => {
                    debug!(
                        timestamp = sample.timestamp,
                        series = i,
                        "dropping sample outside the requested window"
                    );
                }
            }
        }
        metrics.push(record.metric.clone());
    }

    Ok((values, metrics))
}

/// Parse a string-encoded sample value
///
/// Standard float parsing covers every token the engine emits, including its
/// special values `NaN`, `+Inf` and `-Inf`.
fn parse_value(value: &str) -> Result<f64> {
    value.parse().map_err(|_| Error::InvalidSampleValue {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelSet;
    use serde_json::json;

    fn vector_payload(records: serde_json::Value) -> ResultPayload {
        let series: Vec<VectorResult> = serde_json::from_value(records).unwrap();
        ResultPayload::Vector(series)
    }

    fn matrix_payload(records: serde_json::Value) -> ResultPayload {
        let series: Vec<MatrixResult> = serde_json::from_value(records).unwrap();
        ResultPayload::Matrix(series)
    }

    #[test]
    fn test_scalar_passes_through() {
        let value = materialize(
            ResultPayload::Scalar((0.0, "3.14".to_string())),
            None,
            None,
            None,
        )
        .unwrap();
        match value {
            QueryValue::Scalar(v) => assert_eq!(v, 3.14),
            other => panic!("expected scalar, got {}", other.shape()),
        }
    }

    #[test]
    fn test_string_passes_through() {
        let value = materialize(
            ResultPayload::String((0.0, "hello".to_string())),
            None,
            None,
            None,
        )
        .unwrap();
        match value {
            QueryValue::String(s) => assert_eq!(s, "hello"),
            other => panic!("expected string, got {}", other.shape()),
        }
    }

    #[test]
    fn test_vector_materializes_in_input_order() {
        let payload = vector_payload(json!([
            {"metric": {"job": "b"}, "value": [0.0, "2"]},
            {"metric": {"job": "a"}, "value": [0.0, "1"]},
        ]));
        let vector = materialize(payload, None, None, None)
            .unwrap()
            .into_vector()
            .unwrap();

        assert_eq!(vector.values(), [2.0, 1.0]);
        assert_eq!(vector.index().label_value(0, "job"), Some("b"));
    }

    #[test]
    fn test_vector_special_values_survive() {
        let payload = vector_payload(json!([
            {"metric": {"job": "a"}, "value": [0.0, "NaN"]},
            {"metric": {"job": "b"}, "value": [0.0, "+Inf"]},
            {"metric": {"job": "c"}, "value": [0.0, "-Inf"]},
        ]));
        let vector = materialize(payload, None, None, None)
            .unwrap()
            .into_vector()
            .unwrap();

        assert!(vector.values()[0].is_nan());
        assert_eq!(vector.values()[1], f64::INFINITY);
        assert_eq!(vector.values()[2], f64::NEG_INFINITY);
    }

    #[test]
    fn test_vector_sort_key_orders_series() {
        let payload = vector_payload(json!([
            {"metric": {"job": "b"}, "value": [0.0, "2"]},
            {"metric": {"job": "a"}, "value": [0.0, "1"]},
        ]));
        let sort: SortKeyFn = Box::new(|m: &LabelSet| m["job"].clone());
        let vector = materialize(payload, None, None, Some(&sort))
            .unwrap()
            .into_vector()
            .unwrap();

        assert_eq!(vector.values(), [1.0, 2.0]);
        assert_eq!(vector.index().label_value(0, "job"), Some("a"));
    }

    #[test]
    fn test_matrix_aligns_to_grid() {
        let grid = TimeGrid::new(0.0, 10.0, 5.0);
        // samples carry jitter; nearest-slot rounding absorbs it
        let payload = matrix_payload(json!([
            {"metric": {"job": "a"}, "values": [[0.1, "1"], [5.4, "2"], [9.8, "3"]]},
        ]));
        let matrix = materialize(payload, Some(&grid), None, None)
            .unwrap()
            .into_matrix()
            .unwrap();

        assert_eq!(matrix.grid_len(), 3);
        assert_eq!(matrix.column(0).unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_matrix_missing_slots_stay_nan() {
        let grid = TimeGrid::new(0.0, 20.0, 5.0);
        let payload = matrix_payload(json!([
            {"metric": {"job": "a"}, "values": [[0.0, "1"], [10.0, "2"]]},
        ]));
        let matrix = materialize(payload, Some(&grid), None, None)
            .unwrap()
            .into_matrix()
            .unwrap();

        let col = matrix.column(0).unwrap();
        assert_eq!(col[0], 1.0);
        assert!(col[1].is_nan());
        assert_eq!(col[2], 2.0);
        assert!(col[3].is_nan());
        assert!(col[4].is_nan());
    }

    #[test]
    fn test_matrix_drops_out_of_window_samples() {
        let grid = TimeGrid::new(0.0, 10.0, 5.0);
        let payload = matrix_payload(json!([
            {"metric": {"job": "a"}, "values": [[-50.0, "9"], [0.0, "1"], [60.0, "9"]]},
        ]));
        let matrix = materialize(payload, Some(&grid), None, None)
            .unwrap()
            .into_matrix()
            .unwrap();

        let col = matrix.column(0).unwrap();
        assert_eq!(col[0], 1.0);
        assert!(col[1].is_nan());
        assert!(col[2].is_nan());
    }

    #[test]
    fn test_matrix_zero_step_drops_all_samples() {
        // every sample lands outside the empty grid instead of panicking
        let grid = TimeGrid::new(0.0, 10.0, 0.0);
        let payload = matrix_payload(json!([
            {"metric": {"job": "a"}, "values": [[0.0, "1"], [5.0, "2"]]},
        ]));
        let matrix = materialize(payload, Some(&grid), None, None)
            .unwrap()
            .into_matrix()
            .unwrap();

        assert_eq!(matrix.grid_len(), 0);
        assert_eq!(matrix.column(0).unwrap().len(), 0);
    }

    #[test]
    fn test_matrix_without_grid_is_rejected() {
        let payload = matrix_payload(json!([
            {"metric": {"job": "a"}, "values": [[0.0, "1"]]},
        ]));
        let err = materialize(payload, None, None, None).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResultShape { got: "matrix", .. }));
    }

    #[test]
    fn test_invalid_value_token_is_rejected() {
        let payload = vector_payload(json!([
            {"metric": {"job": "a"}, "value": [0.0, "not-a-number"]},
        ]));
        let err = materialize(payload, None, None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidSampleValue { .. }));
    }
}
