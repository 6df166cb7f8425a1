use crate::error::AnalyticsError;
use configuration::{Exclusions, normalize};
use core_types::{ChargeRecord, LotCostMetric, StockRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One charge-type line of a lot's cost breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeBreakdownLine {
    pub charge_type: String,
    pub amount: Decimal,
    /// Excluded lines are shown here but are not part of the lot's total.
    pub excluded: bool,
}

/// Running totals for one lot while the ledger is scanned.
struct LotAccumulator {
    exporter: String,
    total: Decimal,
}

/// A stateless calculator that turns charge ledger rows into per-lot costs.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups the ledger by lot and derives each lot's cost per box.
    ///
    /// # Arguments
    ///
    /// * `charges` - The charge ledger rows, in ledger order.
    /// * `boxes_by_lot` - Box counts per lot (see [`boxes_by_lot`]).
    /// * `exclusions` - Charge types in this set are left out of the totals.
    ///
    /// # Returns
    ///
    /// One `LotCostMetric` per lot, keyed and ordered by lot id. The only
    /// error is an empty ledger while the stock feed still expects lots.
    pub fn aggregate(
        &self,
        charges: &[ChargeRecord],
        boxes_by_lot: &BTreeMap<String, u64>,
        exclusions: &Exclusions,
    ) -> Result<BTreeMap<String, LotCostMetric>, AnalyticsError> {
        if charges.is_empty() {
            if !boxes_by_lot.is_empty() {
                return Err(AnalyticsError::EmptyChargeFeed(boxes_by_lot.len()));
            }
            return Ok(BTreeMap::new());
        }

        let mut lots: BTreeMap<String, LotAccumulator> = BTreeMap::new();
        let mut excluded_rows = 0usize;

        for charge in charges {
            let lot_id = charge.lot_id.trim();
            if lot_id.is_empty() {
                tracing::warn!(
                    charge_type = %charge.charge_type,
                    amount = %charge.amount,
                    "Skipping charge row without a lot id."
                );
                continue;
            }

            let lot = lots.entry(lot_id.to_string()).or_insert_with(|| LotAccumulator {
                exporter: String::new(),
                total: Decimal::ZERO,
            });

            // The first non-blank exporter seen for a lot wins.
            let exporter = charge.exporter.trim();
            if lot.exporter.is_empty() {
                lot.exporter = exporter.to_string();
            } else if !exporter.is_empty() && lot.exporter != exporter {
                tracing::warn!(
                    lot_id,
                    kept = %lot.exporter,
                    ignored = exporter,
                    "Conflicting exporters for one lot; keeping the first."
                );
            }

            if exclusions.is_charge_type_excluded(&charge.charge_type) {
                excluded_rows += 1;
                continue;
            }
            match lot.total.checked_add(charge.amount) {
                Some(total) => lot.total = total,
                None => tracing::warn!(
                    lot_id,
                    charge_type = %charge.charge_type,
                    amount = %charge.amount,
                    "Lot total overflows; skipping charge row."
                ),
            }
        }

        tracing::debug!(
            rows = charges.len(),
            excluded_rows,
            lots = lots.len(),
            "Aggregated charge ledger."
        );

        let metrics = lots
            .into_iter()
            .map(|(lot_id, lot)| {
                let boxes = boxes_by_lot.get(&lot_id).copied().unwrap_or(0);
                let metric = LotCostMetric::new(lot_id.clone(), lot.exporter, lot.total, boxes);
                (lot_id, metric)
            })
            .collect();

        Ok(metrics)
    }

    /// Per-charge-type totals for one lot, ordered by charge type.
    ///
    /// Unlike [`AnalyticsEngine::aggregate`] this keeps excluded charge types,
    /// flagging them, so a detail view can still show commissions and advances.
    pub fn charge_breakdown(
        &self,
        charges: &[ChargeRecord],
        lot_id: &str,
        exclusions: &Exclusions,
    ) -> Vec<ChargeBreakdownLine> {
        let lot_id = lot_id.trim();
        let mut by_type: BTreeMap<String, Decimal> = BTreeMap::new();

        for charge in charges.iter().filter(|c| c.lot_id.trim() == lot_id) {
            let amount = by_type
                .entry(normalize(&charge.charge_type))
                .or_insert(Decimal::ZERO);
            *amount = amount.saturating_add(charge.amount);
        }

        by_type
            .into_iter()
            .map(|(charge_type, amount)| ChargeBreakdownLine {
                excluded: exclusions.is_charge_type_excluded(&charge_type),
                charge_type,
                amount,
            })
            .collect()
    }
}

/// Folds the stock feed into a box count per lot, summing every variety.
pub fn boxes_by_lot(stock: &[StockRecord]) -> BTreeMap<String, u64> {
    let mut boxes: BTreeMap<String, u64> = BTreeMap::new();
    for record in stock {
        let lot_id = record.lot_id.trim();
        if lot_id.is_empty() {
            continue;
        }
        let entry = boxes.entry(lot_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(record.initial_stock_boxes);
    }
    boxes
}

/// Groups lots by exporter name, keeping each group in input order.
pub fn group_by_exporter(lots: &[LotCostMetric]) -> BTreeMap<&str, Vec<&LotCostMetric>> {
    let mut groups: BTreeMap<&str, Vec<&LotCostMetric>> = BTreeMap::new();
    for lot in lots {
        groups.entry(lot.exporter()).or_default().push(lot);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn charge(lot: &str, exporter: &str, charge_type: &str, amount: Decimal) -> ChargeRecord {
        ChargeRecord {
            lot_id: lot.to_string(),
            exporter: exporter.to_string(),
            charge_type: charge_type.to_string(),
            amount,
        }
    }

    fn stock(lot: &str, variety: &str, boxes: u64) -> StockRecord {
        StockRecord {
            lot_id: lot.to_string(),
            exporter: "X".to_string(),
            variety: variety.to_string(),
            initial_stock_boxes: boxes,
        }
    }

    #[test]
    fn sums_charges_and_divides_by_boxes() {
        let charges = vec![
            charge("L1", "X", "PACKING", dec!(100)),
            charge("L1", "X", "OCEAN FREIGHT", dec!(50)),
        ];
        let boxes = BTreeMap::from([("L1".to_string(), 100)]);

        let metrics = AnalyticsEngine::new()
            .aggregate(&charges, &boxes, &Exclusions::none())
            .expect("non-empty ledger");

        let l1 = &metrics["L1"];
        assert_eq!(l1.exporter(), "X");
        assert_eq!(l1.total_charge_amount(), dec!(150));
        assert_eq!(l1.cost_per_box(), Some(dec!(1.5)));
    }

    #[test]
    fn excluded_charge_types_are_left_out_case_insensitively() {
        let charges = vec![
            charge("L1", "X", "PACKING", dec!(100)),
            charge("L1", "X", "commission", dec!(400)),
        ];
        let boxes = BTreeMap::from([("L1".to_string(), 50)]);
        let exclusions = Exclusions::new(&["COMMISSION"], &[]).expect("valid exclusions");

        let metrics = AnalyticsEngine::new()
            .aggregate(&charges, &boxes, &exclusions)
            .expect("non-empty ledger");

        assert_eq!(metrics["L1"].total_charge_amount(), dec!(100));
        assert_eq!(metrics["L1"].cost_per_box(), Some(dec!(2)));
    }

    #[test]
    fn lot_without_stock_has_no_cost() {
        let charges = vec![charge("L2", "X", "PACKING", dec!(75))];

        let metrics = AnalyticsEngine::new()
            .aggregate(&charges, &BTreeMap::new(), &Exclusions::none())
            .expect("non-empty ledger");

        assert_eq!(metrics["L2"].total_boxes(), 0);
        assert_eq!(metrics["L2"].cost_per_box(), None);
    }

    #[test]
    fn first_non_blank_exporter_wins() {
        let charges = vec![
            charge("L1", "", "PACKING", dec!(1)),
            charge("L1", "ALPHA", "PACKING", dec!(1)),
            charge("L1", "BETA", "PACKING", dec!(1)),
        ];

        let metrics = AnalyticsEngine::new()
            .aggregate(&charges, &BTreeMap::new(), &Exclusions::none())
            .expect("non-empty ledger");

        assert_eq!(metrics["L1"].exporter(), "ALPHA");
    }

    #[test]
    fn empty_ledger_with_expected_lots_is_an_error() {
        let boxes = BTreeMap::from([("L1".to_string(), 10), ("L2".to_string(), 20)]);

        let err = AnalyticsEngine::new()
            .aggregate(&[], &boxes, &Exclusions::none())
            .unwrap_err();

        assert_eq!(err, AnalyticsError::EmptyChargeFeed(2));
    }

    #[test]
    fn empty_ledger_without_stock_is_empty() {
        let metrics = AnalyticsEngine::new()
            .aggregate(&[], &BTreeMap::new(), &Exclusions::none())
            .expect("nothing expected");
        assert!(metrics.is_empty());
    }

    #[test]
    fn stock_rows_are_summed_per_lot() {
        let boxes = boxes_by_lot(&[
            stock("L1", "HASS", 40),
            stock("L1", "FUERTE", 60),
            stock("L2", "HASS", 5),
        ]);
        assert_eq!(boxes["L1"], 100);
        assert_eq!(boxes["L2"], 5);
    }

    #[test]
    fn breakdown_keeps_excluded_charges_visible() {
        let charges = vec![
            charge("L1", "X", "Packing", dec!(60)),
            charge("L1", "X", "PACKING", dec!(40)),
            charge("L1", "X", "COMMISSION", dec!(25)),
            charge("L9", "Y", "PACKING", dec!(999)),
        ];
        let exclusions = Exclusions::new(&["commission"], &[]).expect("valid exclusions");

        let lines = AnalyticsEngine::new().charge_breakdown(&charges, "L1", &exclusions);

        assert_eq!(
            lines,
            vec![
                ChargeBreakdownLine {
                    charge_type: "COMMISSION".to_string(),
                    amount: dec!(25),
                    excluded: true,
                },
                ChargeBreakdownLine {
                    charge_type: "PACKING".to_string(),
                    amount: dec!(100),
                    excluded: false,
                },
            ]
        );
    }

    #[test]
    fn overflowing_row_is_skipped() {
        let charges = vec![
            charge("L1", "X", "PACKING", Decimal::MAX),
            charge("L1", "X", "OCEAN FREIGHT", Decimal::MAX),
            charge("L2", "X", "PACKING", dec!(100)),
        ];
        let boxes = BTreeMap::from([("L1".to_string(), 10), ("L2".to_string(), 100)]);

        let metrics = AnalyticsEngine::new()
            .aggregate(&charges, &boxes, &Exclusions::none())
            .expect("metrics");

        assert_eq!(metrics["L1"].total_charge_amount(), Decimal::MAX);
        assert_eq!(metrics["L2"].cost_per_box(), Some(dec!(1)));

        let lines = AnalyticsEngine::new().charge_breakdown(&charges, "L1", &Exclusions::none());
        assert_eq!(lines.len(), 2);
    }
}
