//! promgrid - Prometheus query results as dense, label-indexed tables
//!
//! This library provides a synchronous Prometheus API client that:
//! - Materializes vector and matrix results into NaN-prefilled numeric
//!   buffers with a composite label index
//! - Aligns irregular range-query samples onto the regular time grid derived
//!   from `(start, end, step)`
//! - Caches materialized range queries on disk, keyed by the SHA-256 of the
//!   query text
//!
//! # Example
//!
//! ```rust,no_run
//! use promgrid::{InstantOptions, Prometheus};
//!
//! # fn main() -> promgrid::Result<()> {
//! let client = Prometheus::new("http://localhost:9090/")?;
//! let value = client.query("up", InstantOptions::default())?;
//! if let promgrid::QueryValue::Vector(v) = value {
//!     println!("{} series over levels {:?}", v.len(), v.index().levels());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod materialize;
pub mod response;
pub mod table;
pub mod time;
pub mod types;

// Re-export main types
pub use cache::QueryCache;
pub use client::{InstantOptions, Prometheus, RangeOptions};
pub use config::ClientConfig;
pub use error::{CacheError, Error, Result, TransportError, UpstreamQueryError};
pub use table::{LabelIndex, Matrix, TimeGrid, Vector};
pub use types::{DurationSpec, LabelSet, QueryValue, Sample, Timestamp};
