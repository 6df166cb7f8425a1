use crate::enums::{CvClass, DeviationTier, Direction, IssueKind, PerformanceCategory, Severity};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One row of the charge ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub lot_id: String,
    pub exporter: String,
    pub charge_type: String,
    pub amount: Decimal,
}

/// One row of the stock feed. A lot may have one row per variety.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub lot_id: String,
    pub exporter: String,
    #[serde(default)]
    pub variety: String,
    pub initial_stock_boxes: u64,
}

/// The per-lot cost summary produced by the aggregator.
///
/// Fields are private so a metric cannot be edited after construction. When
/// built with [`LotCostMetric::new`], `cost_per_box` is
/// `total_charge_amount / total_boxes` if there are boxes and `None` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotCostMetric {
    lot_id: String,
    exporter: String,
    total_charge_amount: Decimal,
    total_boxes: u64,
    cost_per_box: Option<Decimal>,
}

impl LotCostMetric {
    pub fn new(
        lot_id: impl Into<String>,
        exporter: impl Into<String>,
        total_charge_amount: Decimal,
        total_boxes: u64,
    ) -> Self {
        let cost_per_box = if total_boxes > 0 {
            Some(total_charge_amount / Decimal::from(total_boxes))
        } else {
            None
        };

        Self {
            lot_id: lot_id.into(),
            exporter: exporter.into(),
            total_charge_amount,
            total_boxes,
            cost_per_box,
        }
    }

    /// Wraps a metric computed outside the aggregator (an imported snapshot,
    /// say) verbatim. The values are not reconciled, so a contradictory
    /// snapshot survives long enough for the internal analyzer to flag it.
    pub fn from_parts(
        lot_id: impl Into<String>,
        exporter: impl Into<String>,
        total_charge_amount: Decimal,
        total_boxes: u64,
        cost_per_box: Option<Decimal>,
    ) -> Self {
        Self {
            lot_id: lot_id.into(),
            exporter: exporter.into(),
            total_charge_amount,
            total_boxes,
            cost_per_box,
        }
    }

    pub fn lot_id(&self) -> &str {
        &self.lot_id
    }

    pub fn exporter(&self) -> &str {
        &self.exporter
    }

    pub fn total_charge_amount(&self) -> Decimal {
        self.total_charge_amount
    }

    pub fn total_boxes(&self) -> u64 {
        self.total_boxes
    }

    pub fn cost_per_box(&self) -> Option<Decimal> {
        self.cost_per_box
    }

    /// The per-box cost as `f64` for the statistical layer.
    pub fn cost_per_box_f64(&self) -> Option<f64> {
        self.cost_per_box.and_then(|c| c.to_f64())
    }

    /// True when the lot carries a strictly positive per-box cost, i.e. it is
    /// eligible for population statistics.
    pub fn has_positive_cost(&self) -> bool {
        matches!(self.cost_per_box, Some(c) if c > Decimal::ZERO)
    }

    pub fn is_exporter_missing(&self) -> bool {
        self.exporter.trim().is_empty()
    }
}

/// A single finding from the internal consistency analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub lot_id: String,
    pub exporter: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    pub cost_per_box: Option<Decimal>,
    pub total_charges: Decimal,
}

/// The between-exporter verdict for one exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConsistencyResult {
    pub exporter: String,
    /// Every lot of the exporter, whether or not it had a usable cost.
    pub total_lots: usize,
    /// Lots with a positive per-box cost; the sample the statistics use.
    pub valid_lots: usize,
    pub total_charge_amount: Decimal,
    pub total_boxes: u64,
    pub avg_cost_per_box: f64,
    pub std_deviation: f64,
    pub cv: f64,
    pub classification: CvClass,
    pub severity: Severity,
    pub issues: Vec<String>,
    pub deviation_from_global_sigma: f64,
    pub performance_vs_market_pct: f64,
    pub performance_category: PerformanceCategory,
}

/// A lot outside the population-wide 2-sigma band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub lot_id: String,
    pub exporter: String,
    pub cost_per_box: Decimal,
    pub deviation_sigma: f64,
    pub direction: Direction,
}

/// A lot's deviation from the average per-box cost of one charge type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeTypeDeviationRecord {
    pub lot_id: String,
    pub exporter: String,
    /// Per-box cost of the selected charge type only.
    pub cost_per_box: Decimal,
    /// Signed: positive when the lot is above the charge-type average.
    pub percentage_deviation: Decimal,
    pub severity: DeviationTier,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cost_per_box_is_total_over_boxes() {
        let metric = LotCostMetric::new("L1", "X", dec!(150), 100);
        assert_eq!(metric.cost_per_box(), Some(dec!(1.5)));
        assert_eq!(metric.cost_per_box_f64(), Some(1.5));
        assert!(metric.has_positive_cost());
    }

    #[test]
    fn zero_boxes_means_no_cost() {
        let metric = LotCostMetric::new("L2", "X", dec!(80), 0);
        assert_eq!(metric.cost_per_box(), None);
        assert!(!metric.has_positive_cost());
    }

    #[test]
    fn blank_exporter_is_missing() {
        assert!(LotCostMetric::new("L3", "  ", dec!(1), 1).is_exporter_missing());
        assert!(!LotCostMetric::new("L3", "X", dec!(1), 1).is_exporter_missing());
    }

    #[test]
    fn snapshot_values_are_kept_verbatim() {
        // Zero total with a positive cost: contradictory, and left that way.
        let metric = LotCostMetric::from_parts("L4", "X", dec!(0), 10, Some(dec!(2)));
        assert_eq!(metric.total_charge_amount(), dec!(0));
        assert_eq!(metric.total_boxes(), 10);
        assert_eq!(metric.cost_per_box(), Some(dec!(2)));
        assert!(metric.has_positive_cost());

        let metric = LotCostMetric::from_parts("L5", "X", dec!(30), 0, None);
        assert_eq!(metric, LotCostMetric::new("L5", "X", dec!(30), 0));
    }
}
