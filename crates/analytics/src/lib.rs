//! # Lot Cost Analytics
//!
//! This crate turns raw charge ledger rows into per-lot costs and computes the
//! population statistics the consistency analyzers measure against.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of files or
//!   data sources. It depends only on `core-types` and `configuration`.
//! - **Stateless Calculation:** The `AnalyticsEngine` is a stateless calculator. The
//!   same ledger always yields the same, identically ordered metric map.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: groups charges by lot and derives cost per box.
//! - `compute_stats` / `PopulationStats`: N-divisor mean, standard deviation and CV.
//! - `StatsBaseline`: the global and per-exporter statistics shared by one run.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, ChargeBreakdownLine, boxes_by_lot, group_by_exporter};
pub use error::AnalyticsError;
pub use stats::{PopulationStats, StatsBaseline, compute_stats, lot_cost_stats};
