//! # Lot Cost Outlier Detectors
//!
//! Three outlier schemes live side by side here. They answer different
//! questions for different consumers and their thresholds are never merged:
//!
//! - **Internal** (`1.8σ / 2σ / 2.5σ` tiers plus data-quality rules): the
//!   per-lot consistency report.
//! - **Population** (fixed `2σ`, single tier): the "all outliers" view.
//! - **Charge type** (`10% / 18%` of the charge type's own average): the
//!   per-charge drill-down, e.g. ocean freight or repacking.
//!
//! ## Architectural Principles
//!
//! - **Explicit selection:** The caller names the scheme with a `DetectorKind`
//!   and builds it with `create_detector`. Nothing is inferred from the data.
//! - **Shared baseline:** Sigma-based detectors read the `StatsBaseline` in the
//!   `DetectionContext`; they never recompute the population statistics.
//!
//! ## Public API
//!
//! - `Detector`: The trait all schemes implement.
//! - `DetectorKind`: The tagged enum naming a scheme.
//! - `Detection`: The tagged result, one variant per scheme.
//! - `create_detector`: The factory function to construct a detector instance.

// Declare all the modules that constitute this crate.
pub mod charge_type;
pub mod error;
pub mod factory;
pub mod internal;
pub mod population;

// Re-export the key components to create a clean, public-facing API.
pub use charge_type::ChargeTypeDetector;
pub use error::DetectorError;
pub use factory::create_detector;
pub use internal::InternalDetector;
pub use population::PopulationDetector;

use analytics::StatsBaseline;
use configuration::Exclusions;
use core_types::{
    ChargeRecord, ChargeTypeDeviationRecord, ConsistencyIssue, LotCostMetric, OutlierRecord,
};
use serde::{Deserialize, Serialize};

/// Names one of the detection schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum DetectorKind {
    Internal,
    Population,
    ChargeType { charge_type: String },
}

/// The output of a detector, tagged by the scheme that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scheme", content = "records", rename_all = "snake_case")]
pub enum Detection {
    Internal(Vec<ConsistencyIssue>),
    Population(Vec<OutlierRecord>),
    ChargeType(Vec<ChargeTypeDeviationRecord>),
}

impl Detection {
    pub fn len(&self) -> usize {
        match self {
            Detection::Internal(records) => records.len(),
            Detection::Population(records) => records.len(),
            Detection::ChargeType(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a detector may read. All of it is borrowed and immutable.
///
/// `lots` is the run's metric map in lot-id order; detectors take a lot's
/// exporter and box count from it rather than re-deriving them from `charges`.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub lots: &'a [LotCostMetric],
    pub charges: &'a [ChargeRecord],
    pub baseline: &'a StatsBaseline,
    pub exclusions: &'a Exclusions,
}

/// The core trait that all detection schemes implement.
///
/// Detectors are stateless, so `detect` takes `&self` and the same context
/// always yields the same, identically ordered records.
pub trait Detector: Send + Sync {
    /// A short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Runs the scheme over the context.
    fn detect(&self, ctx: &DetectionContext<'_>) -> Detection;
}
