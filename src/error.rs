//! Error types for promgrid

use thiserror::Error;

/// Result type alias for promgrid operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (HTTP, URL, body decoding)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The query engine returned `status: "error"`
    #[error("Upstream query error: {0}")]
    Upstream(UpstreamQueryError),

    /// Response carried a result type outside {vector, matrix, scalar, string}
    #[error("Unknown result shape: {shape:?}")]
    UnknownResultShape {
        /// The offending `resultType` tag
        shape: String,
    },

    /// Response decoded to a valid shape, but not the one the call requires
    #[error("Unexpected result shape: expected {expected}, got {got}")]
    UnexpectedResultShape {
        /// Shape the operation requires
        expected: &'static str,
        /// Shape the response actually carried
        got: &'static str,
    },

    /// Duration string did not match the Prometheus duration grammar
    #[error("Invalid duration format: {input:?}")]
    InvalidDurationFormat {
        /// The rejected input string
        input: String,
    },

    /// Timestamp string could not be parsed as RFC-3339
    #[error("Invalid timestamp: {input:?}")]
    InvalidTimestampType {
        /// The rejected input
        input: String,
    },

    /// No label names across any series, so a composite index cannot be built
    #[error("Result series carry no label names to index by")]
    EmptyLabelSpace,

    /// A string-encoded sample value did not parse as a float
    #[error("Invalid sample value: {value:?}")]
    InvalidSampleValue {
        /// The rejected value token
        value: String,
    },

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Transport-level errors from the HTTP collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP status outside 2xx and outside {400, 422, 503}
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// A snippet of the response body, for diagnostics
        body: String,
    },

    /// Request-level failure from the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON envelope
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL or path join failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Structured error response from the query engine itself
///
/// Carries the `errorType` and `error` fields of a parsed response body with
/// `status: "error"`, so callers can distinguish bad queries from transport
/// failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamQueryError {
    /// The engine's `errorType` field (e.g. "bad_data")
    pub kind: String,
    /// The engine's `error` message
    pub message: String,
}

impl std::fmt::Display for UpstreamQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure (read, write, create, delete)
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached file exists but cannot be deserialized
    #[error("Corrupt cache entry at {path}: {source}")]
    Corrupt {
        /// Path of the offending cache file
        path: String,
        /// The underlying decode error
        #[source]
        source: bincode::Error,
    },

    /// A table could not be serialized for storage
    #[error("Failed to serialize table: {0}")]
    Serialize(#[source] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamQueryError {
            kind: "bad_data".to_string(),
            message: "invalid parameter".to_string(),
        };
        assert_eq!(err.to_string(), "bad_data: invalid parameter");
    }

    #[test]
    fn test_error_display_carries_offending_value() {
        let err = Error::InvalidDurationFormat {
            input: "abc".to_string(),
        };
        assert!(err.to_string().contains("abc"));

        let err = Error::UnknownResultShape {
            shape: "histogram".to_string(),
        };
        assert!(err.to_string().contains("histogram"));
    }

    #[test]
    fn test_cache_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = CacheError::from(io).into();
        assert!(matches!(err, Error::Cache(CacheError::Io(_))));
    }
}
