//! Read-only projections over persisted validation results.
//!
//! - `buckets` - invalid records grouped by window start and type
//! - `top_errors` - most frequent device-reported error texts
//! - `timeseries` - per-type summary counts over time
//! - `detail` - drill-down for a single measurement

pub mod buckets;
pub mod detail;
pub mod timeseries;
pub mod top_errors;

pub use buckets::*;
pub use detail::*;
pub use timeseries::*;
pub use top_errors::*;
