//! Wire model for the Prometheus HTTP API
//!
//! Serde types for the response envelope returned by `/api/v1/query` and
//! `/api/v1/query_range`, plus the shape-tag dispatch that turns the untyped
//! `result` field into the closed [`ResultPayload`] enum. The shape tag is the
//! one place untrusted input decides control flow, so the dispatch is
//! exhaustive and an unmatched tag fails [`Error::UnknownResultShape`] right
//! at the decode boundary.
//!
//! Sample values stay string-encoded here; parsing them to `f64` is the
//! materializers' job, so the engine's special-value tokens (`NaN`, `+Inf`,
//! `-Inf`) pass through intact.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result, TransportError};
use crate::types::LabelSet;

/// Top-level response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// `"success"` or `"error"`
    pub status: String,

    /// Result payload, present on success
    #[serde(default)]
    pub data: Option<QueryData>,

    /// Error category, present when `status` is `"error"`
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,

    /// Error message, present when `status` is `"error"`
    #[serde(default)]
    pub error: Option<String>,
}

/// The `data` member of a successful response
#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    /// Shape tag: one of `vector`, `matrix`, `scalar`, `string`
    #[serde(rename = "resultType")]
    pub result_type: String,

    /// Shape-dependent result, decoded after tag dispatch
    pub result: Value,
}

/// One series of an instant-query (vector) result
#[derive(Debug, Clone, Deserialize)]
pub struct VectorResult {
    /// Labels identifying this series
    pub metric: LabelSet,
    /// `(evaluation timestamp, string-encoded value)`
    pub value: (f64, String),
}

/// One series of a range-query (matrix) result
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixResult {
    /// Labels identifying this series
    pub metric: LabelSet,
    /// Ordered `(timestamp, string-encoded value)` samples
    pub values: Vec<(f64, String)>,
}

/// A successful result, decoded into its declared shape
#[derive(Debug, Clone)]
pub enum ResultPayload {
    /// Instant query result: one single-sample record per series
    Vector(Vec<VectorResult>),
    /// Range query result: one sample sequence per series
    Matrix(Vec<MatrixResult>),
    /// `(timestamp, string-encoded number)`
    Scalar((f64, String)),
    /// `(timestamp, string value)`
    String((f64, String)),
}

impl ResultPayload {
    /// Name of the shape this payload carries, matching the wire tag
    pub fn shape(&self) -> &'static str {
        match self {
            ResultPayload::Vector(_) => "vector",
            ResultPayload::Matrix(_) => "matrix",
            ResultPayload::Scalar(_) => "scalar",
            ResultPayload::String(_) => "string",
        }
    }
}

impl QueryData {
    /// Dispatch on the shape tag into the closed payload enum
    pub fn into_payload(self) -> Result<ResultPayload> {
        match self.result_type.as_str() {
            "vector" => Ok(ResultPayload::Vector(decode(self.result)?)),
            "matrix" => Ok(ResultPayload::Matrix(decode(self.result)?)),
            "scalar" => Ok(ResultPayload::Scalar(decode(self.result)?)),
            "string" => Ok(ResultPayload::String(decode(self.result)?)),
            other => Err(Error::UnknownResultShape {
                shape: other.to_string(),
            }),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Transport(TransportError::Decode(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_vector_payload() {
        let data: QueryData = serde_json::from_value(json!({
            "resultType": "vector",
            "result": [
                {"metric": {"__name__": "up", "job": "node"}, "value": [1700000000.0, "1"]},
                {"metric": {"job": "api"}, "value": [1700000000.0, "NaN"]},
            ]
        }))
        .unwrap();

        match data.into_payload().unwrap() {
            ResultPayload::Vector(series) => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].metric["job"], "node");
                assert_eq!(series[1].value.1, "NaN");
            }
            other => panic!("expected vector, got {}", other.shape()),
        }
    }

    #[test]
    fn test_decode_matrix_payload() {
        let data: QueryData = serde_json::from_value(json!({
            "resultType": "matrix",
            "result": [
                {"metric": {"instance": "a"}, "values": [[0.0, "1.5"], [5.0, "2.5"]]},
            ]
        }))
        .unwrap();

        match data.into_payload().unwrap() {
            ResultPayload::Matrix(series) => {
                assert_eq!(series[0].values.len(), 2);
                assert_eq!(series[0].values[1], (5.0, "2.5".to_string()));
            }
            other => panic!("expected matrix, got {}", other.shape()),
        }
    }

    #[test]
    fn test_decode_scalar_and_string_payloads() {
        let data: QueryData = serde_json::from_value(json!({
            "resultType": "scalar",
            "result": [1700000000.0, "3.14"]
        }))
        .unwrap();
        assert!(matches!(data.into_payload().unwrap(), ResultPayload::Scalar(_)));

        let data: QueryData = serde_json::from_value(json!({
            "resultType": "string",
            "result": [1700000000.0, "hello"]
        }))
        .unwrap();
        match data.into_payload().unwrap() {
            ResultPayload::String((_, s)) => assert_eq!(s, "hello"),
            other => panic!("expected string, got {}", other.shape()),
        }
    }

    #[test]
    fn test_unknown_shape_tag_is_fatal() {
        let data: QueryData = serde_json::from_value(json!({
            "resultType": "histogram",
            "result": []
        }))
        .unwrap();

        match data.into_payload() {
            Err(Error::UnknownResultShape { shape }) => assert_eq!(shape, "histogram"),
            other => panic!("expected UnknownResultShape, got {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_decodes() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "invalid parameter \"query\""
        }))
        .unwrap();

        assert_eq!(resp.status, "error");
        assert_eq!(resp.error_type.as_deref(), Some("bad_data"));
        assert!(resp.data.is_none());
    }
}
