//! # Lot Cost Core Types
//!
//! Layer 0 of the workspace: the plain data records exchanged between the
//! aggregator, the analyzers and the detectors. Nothing in here performs any
//! analysis; every struct is an immutable value once built.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    CvClass, DeviationTier, Direction, InternalCvClass, IssueKind, PerformanceCategory, Severity,
};
pub use error::CoreError;
pub use structs::{
    ChargeRecord, ChargeTypeDeviationRecord, ConsistencyIssue, ExporterConsistencyResult,
    LotCostMetric, OutlierRecord, StockRecord,
};
