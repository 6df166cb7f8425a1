//! # Lot Cost Consistency Analyzer
//!
//! Rule evaluation on top of the per-lot metrics and the shared statistical
//! baseline from the `analytics` crate.
//!
//! - [`internal`] checks each lot against the population and its own exporter,
//!   producing zero or more `ConsistencyIssue`s per lot.
//! - [`external`] compares each exporter's cost pattern with the market,
//!   producing one `ExporterConsistencyResult` per exporter.
//!
//! Both are total functions: malformed business data becomes an issue, never
//! an error.

pub mod external;
pub mod internal;

pub use external::{analyze_external, analyze_external_with_baseline};
pub use internal::analyze;
