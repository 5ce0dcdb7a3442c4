//! Synchronous Prometheus API client
//!
//! Issues blocking GET requests to `/api/v1/query` and `/api/v1/query_range`
//! and materializes the responses. The underlying HTTP connection pool is
//! owned by the client for its lifetime and released when it drops.
//!
//! # Example
//!
//! ```rust,no_run
//! use promgrid::{Prometheus, RangeOptions};
//!
//! # fn main() -> promgrid::Result<()> {
//! let client = Prometheus::new("http://localhost:9090/")?
//!     .with_cache_dir("/tmp/promgrid-cache");
//!
//! let table = client.query_range(
//!     "rate(node_cpu_seconds_total[5m])",
//!     1700000000.0,
//!     1700003600.0,
//!     "1m",
//!     RangeOptions::default(),
//! )?;
//! println!("{} series x {} grid points", table.series_count(), table.grid_len());
//! # Ok(())
//! # }
//! ```

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError, UpstreamQueryError};
use crate::materialize::materialize;
use crate::response::{ApiResponse, QueryData};
use crate::table::{Matrix, TimeGrid};
use crate::types::{DurationSpec, LabelSet, QueryValue, SortKeyFn, Timestamp};

/// HTTP statuses whose bodies are legitimate API error envelopes
const PARSEABLE_ERROR_STATUSES: [u16; 3] = [400, 422, 503];

/// Options for an instant query
#[derive(Default)]
pub struct InstantOptions {
    /// Evaluation timestamp; the engine uses its current time when unset
    pub time: Option<Timestamp>,
    /// Evaluation timeout, forwarded to the engine
    pub timeout: Option<DurationSpec>,
    /// Extra labels merged into every series, overriding engine labels
    pub labels: Option<LabelSet>,
    /// Sort key projecting a series' label set, applied before materialization
    pub sort: Option<SortKeyFn>,
}

impl InstantOptions {
    /// Set the evaluation timestamp
    pub fn at(mut self, time: impl Into<Timestamp>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Set the evaluation timeout
    pub fn with_timeout(mut self, timeout: impl Into<DurationSpec>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Merge extra labels into every series
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sort series by a projection of their label sets
    pub fn sorted_by(mut self, key: SortKeyFn) -> Self {
        self.sort = Some(key);
        self
    }
}

/// Options for a range query
#[derive(Default)]
pub struct RangeOptions {
    /// Evaluation timeout, forwarded to the engine
    pub timeout: Option<DurationSpec>,
    /// Extra labels merged into every series, overriding engine labels
    pub labels: Option<LabelSet>,
    /// Sort key projecting a series' label set, applied before materialization
    pub sort: Option<SortKeyFn>,
    /// Invalidate this query's cache entry before looking it up
    pub flush_cache: bool,
}

impl RangeOptions {
    /// Set the evaluation timeout
    pub fn with_timeout(mut self, timeout: impl Into<DurationSpec>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Merge extra labels into every series
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sort series by a projection of their label sets
    pub fn sorted_by(mut self, key: SortKeyFn) -> Self {
        self.sort = Some(key);
        self
    }

    /// Invalidate this query's cache entry before looking it up
    pub fn flush_cache(mut self) -> Self {
        self.flush_cache = true;
        self
    }
}

/// Synchronous Prometheus API client
///
/// Everything blocks: no internal parallelism, retries, or local timeout
/// enforcement. A timeout given per call is forwarded to the engine as a
/// request parameter only.
#[derive(Debug)]
pub struct Prometheus {
    api_url: Url,
    headers: HeaderMap,
    http: HttpClient,
    cache: Option<QueryCache>,
    default_timeout: Option<f64>,
}

impl Prometheus {
    /// Create a client for the API endpoint at `api_url`
    ///
    /// Paths are joined onto the URL as-is, so it should end with `/` for the
    /// usual `http://host:9090/` form.
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url).map_err(TransportError::InvalidUrl)?;
        Ok(Self {
            api_url,
            headers: HeaderMap::new(),
            http: HttpClient::new(),
            cache: None,
            default_timeout: None,
        })
    }

    /// Create a client from a validated [`ClientConfig`]
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name: HeaderName = name
                .parse()
                .map_err(|_| Error::Configuration(format!("Invalid header name: {}", name)))?;
            let value: HeaderValue = value
                .parse()
                .map_err(|_| Error::Configuration(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        let mut client = Self::new(&config.api_url)?.with_headers(headers);
        if let Some(dir) = &config.cache_dir {
            client = client.with_cache_dir(dir.clone());
        }
        client.default_timeout = config.timeout;
        Ok(client)
    }

    /// Attach headers to every request
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Enable the range-query cache rooted at `dir`
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = Some(QueryCache::new(dir));
        self
    }

    /// The cache, when one is configured
    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Evaluate an instant query at a single point in time
    ///
    /// Returns whichever shape the expression produces: a [`QueryValue::Vector`]
    /// for selector-like expressions, or a scalar/string passed through
    /// unchanged.
    pub fn query(&self, expr: &str, opts: InstantOptions) -> Result<QueryValue> {
        let mut params: Vec<(&str, String)> = vec![("query", expr.to_string())];
        if let Some(time) = &opts.time {
            params.push(("time", fmt_seconds(time.to_unix_seconds()?)));
        }
        if let Some(timeout) = self.effective_timeout(opts.timeout)? {
            params.push(("timeout", fmt_seconds(timeout)));
        }

        let data = self.do_query("api/v1/query", &params)?;
        let value = materialize(
            data.into_payload()?,
            None,
            opts.labels.as_ref(),
            opts.sort.as_ref(),
        )?;
        debug!(shape = value.shape(), "materialized instant query");
        Ok(value)
    }

    /// Evaluate an expression over `[start, end]` at fixed `step`
    ///
    /// When a cache directory is configured the result is cached by query
    /// text: a forced flush (if requested) runs first, then a lookup; a hit
    /// returns without contacting the engine, a miss runs the query and
    /// stores the materialized table.
    pub fn query_range(
        &self,
        expr: &str,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        step: impl Into<DurationSpec>,
        opts: RangeOptions,
    ) -> Result<Matrix> {
        let start = start.into().to_unix_seconds()?;
        let end = end.into().to_unix_seconds()?;
        let step = step.into().to_seconds()?;

        let key = QueryCache::key_for(expr);
        if let Some(cache) = &self.cache {
            if opts.flush_cache {
                cache.invalidate(&key)?;
            }
            if let Some(table) = cache.lookup(&key)? {
                return Ok(table);
            }
        }

        let mut params: Vec<(&str, String)> = vec![
            ("query", expr.to_string()),
            ("start", fmt_seconds(start)),
            ("end", fmt_seconds(end)),
            ("step", fmt_seconds(step)),
        ];
        if let Some(timeout) = self.effective_timeout(opts.timeout)? {
            params.push(("timeout", fmt_seconds(timeout)));
        }

        let data = self.do_query("api/v1/query_range", &params)?;
        let payload = data.into_payload()?;
        let got = payload.shape();

        let grid = TimeGrid::new(start, end, step);
        let table = materialize(payload, Some(&grid), opts.labels.as_ref(), opts.sort.as_ref())?
            .into_matrix()
            .ok_or(Error::UnexpectedResultShape {
                expected: "matrix",
                got,
            })?;
        debug!(
            series = table.series_count(),
            grid_len = table.grid_len(),
            "materialized range query"
        );

        if let Some(cache) = &self.cache {
            cache.store(&key, &table)?;
        }
        Ok(table)
    }

    /// Issue one GET and decode the response envelope
    ///
    /// Statuses 400, 422 and 503 carry legitimate error envelopes and are
    /// parsed like success responses; any other non-2xx status is a transport
    /// failure. A parsed envelope with `status != "success"` is a fatal
    /// upstream error carrying the engine's `errorType` and message.
    fn do_query(&self, path: &str, params: &[(&str, String)]) -> Result<QueryData> {
        let url = self.api_url.join(path).map_err(TransportError::InvalidUrl)?;
        debug!(%url, "issuing query");

        let resp = self
            .http
            .get(url)
            .headers(self.headers.clone())
            .query(params)
            .send()
            .map_err(TransportError::Http)?;

        let status = resp.status();
        if !status.is_success() && !PARSEABLE_ERROR_STATUSES.contains(&status.as_u16()) {
            let body = resp.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            }
            .into());
        }

        let envelope: ApiResponse = resp.json().map_err(TransportError::Http)?;
        if envelope.status != "success" {
            return Err(Error::Upstream(UpstreamQueryError {
                kind: envelope.error_type.unwrap_or_default(),
                message: envelope.error.unwrap_or_default(),
            }));
        }

        envelope.data.ok_or_else(|| {
            use serde::de::Error as _;
            TransportError::Decode(serde_json::Error::custom(
                "success response missing the data field",
            ))
            .into()
        })
    }

    /// Per-call timeout, falling back to the configured default
    fn effective_timeout(&self, timeout: Option<DurationSpec>) -> Result<Option<f64>> {
        match timeout {
            Some(t) => Ok(Some(t.to_seconds()?)),
            None => Ok(self.default_timeout),
        }
    }
}

/// Format a seconds value as a request parameter
fn fmt_seconds(secs: f64) -> String {
    format!("{}", secs)
}

/// First part of a response body, for error diagnostics
fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_url() {
        let err = Prometheus::new("not a url").unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_header_names() {
        let mut config = ClientConfig::new("http://localhost:9090/");
        config
            .headers
            .insert("bad header\n".to_string(), "x".to_string());
        assert!(matches!(
            Prometheus::from_config(&config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_fmt_seconds_round_trips_cleanly() {
        assert_eq!(fmt_seconds(5400.0), "5400");
        assert_eq!(fmt_seconds(0.5), "0.5");
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.len() < long.len());
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }
}
