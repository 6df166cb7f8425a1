//! # Lot Cost Consistency Engine
//!
//! The orchestrator that wires the pipeline together:
//!
//! ```text
//! charges + stock -> lot metrics -> statistics baseline -> detectors -> report
//! ```
//!
//! The baseline is computed once per run and handed to every detector, so the
//! internal rules, the exporter comparison and the population view all measure
//! against the same numbers.

use analytics::{AnalyticsEngine, StatsBaseline, boxes_by_lot};
use configuration::{EngineConfig, Exclusions};
use core_types::{ChargeRecord, LotCostMetric, StockRecord};
use detectors::{
    Detection, DetectionContext, DetectorKind, InternalDetector, PopulationDetector,
    create_detector,
};
use std::collections::BTreeMap;

pub mod error;
pub mod report;

pub use analytics::ChargeBreakdownLine;
pub use error::EngineError;
pub use report::{ConsistencyReport, ReportSummary};

/// Runs analyses over in-memory charge and stock feeds.
///
/// Holds only the exclusion lists; every run is independent and leaves no
/// state behind.
#[derive(Debug, Clone)]
pub struct CostEngine {
    exclusions: Exclusions,
    analytics: AnalyticsEngine,
}

/// The per-run inputs every detector shares.
struct Prepared {
    lots: Vec<LotCostMetric>,
    baseline: StatsBaseline,
}

impl CostEngine {
    pub fn new(exclusions: Exclusions) -> Self {
        Self {
            exclusions,
            analytics: AnalyticsEngine::new(),
        }
    }

    /// Builds an engine from loaded configuration, validating the exclusion lists.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self::new(config.exclusions()?))
    }

    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }

    fn prepare(
        &self,
        charges: &[ChargeRecord],
        stock: &[StockRecord],
    ) -> Result<Prepared, EngineError> {
        let boxes_by_lot = boxes_by_lot(stock);
        let metrics = self
            .analytics
            .aggregate(charges, &boxes_by_lot, &self.exclusions)?;
        let lots: Vec<LotCostMetric> = metrics.into_values().collect();
        let baseline = StatsBaseline::build(&lots, &self.exclusions);

        Ok(Prepared {
            lots,
            baseline,
        })
    }

    /// Aggregates the feeds into one metric per lot, keyed by lot id.
    pub fn lot_metrics(
        &self,
        charges: &[ChargeRecord],
        stock: &[StockRecord],
    ) -> Result<BTreeMap<String, LotCostMetric>, EngineError> {
        let boxes_by_lot = boxes_by_lot(stock);
        Ok(self
            .analytics
            .aggregate(charges, &boxes_by_lot, &self.exclusions)?)
    }

    /// Runs the full pipeline: internal rules, exporter comparison and the
    /// population outlier view.
    pub fn run(
        &self,
        charges: &[ChargeRecord],
        stock: &[StockRecord],
    ) -> Result<ConsistencyReport, EngineError> {
        tracing::info!(
            charge_rows = charges.len(),
            stock_rows = stock.len(),
            "Starting lot cost analysis."
        );

        let prepared = self.prepare(charges, stock)?;
        let ctx = DetectionContext {
            lots: &prepared.lots,
            charges,
            baseline: &prepared.baseline,
            exclusions: &self.exclusions,
        };

        let internal_issues = InternalDetector::new().issues(&ctx);
        let exporter_results = analyzer::analyze_external_with_baseline(
            &prepared.lots,
            &self.exclusions,
            &prepared.baseline,
        );
        let population_outliers = PopulationDetector::new().outliers(&ctx);

        let summary = ReportSummary::tally(
            &prepared.lots,
            &internal_issues,
            &exporter_results,
            &population_outliers,
        );

        tracing::info!(
            lots = summary.lots,
            high = summary.high_issues,
            medium = summary.medium_issues,
            low = summary.low_issues,
            exporters = summary.exporters,
            statistical_outliers = summary.statistical_outliers,
            outliers = summary.population_outliers,
            "Lot cost analysis complete."
        );

        Ok(ConsistencyReport {
            lots: prepared.lots,
            baseline: prepared.baseline,
            internal_issues,
            exporter_results,
            population_outliers,
            summary,
        })
    }

    /// Runs one named detection scheme on its own.
    pub fn run_detector(
        &self,
        kind: &DetectorKind,
        charges: &[ChargeRecord],
        stock: &[StockRecord],
    ) -> Result<Detection, EngineError> {
        let detector = create_detector(kind)?;
        let prepared = self.prepare(charges, stock)?;
        let ctx = DetectionContext {
            lots: &prepared.lots,
            charges,
            baseline: &prepared.baseline,
            exclusions: &self.exclusions,
        };

        let detection = detector.detect(&ctx);
        tracing::info!(
            detector = detector.name(),
            records = detection.len(),
            "Detector run complete."
        );
        Ok(detection)
    }

    /// Per-charge-type totals for one lot, excluded charge types flagged.
    pub fn charge_breakdown(
        &self,
        charges: &[ChargeRecord],
        lot_id: &str,
    ) -> Vec<ChargeBreakdownLine> {
        self.analytics
            .charge_breakdown(charges, lot_id, &self.exclusions)
    }
}

impl Default for CostEngine {
    fn default() -> Self {
        Self::new(Exclusions::none())
    }
}
