use crate::error::DetectorError;
use crate::{Detection, DetectionContext, Detector};
use configuration::normalize;
use core_types::{ChargeRecord, ChargeTypeDeviationRecord, DeviationTier, LotCostMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Deviation (%) from which a lot is a Medium finding.
const MEDIUM_PCT: Decimal = dec!(10);
/// Deviation (%) from which a lot is a High finding.
const HIGH_PCT: Decimal = dec!(18);

/// Compares each lot's per-box cost for one charge type with that charge
/// type's own average.
///
/// The baseline is independent of the global cost-per-box population: only
/// the selected charge type's amounts are summed, and the average is taken
/// over lots of non-excluded exporters that have boxes and a positive amount.
/// A lot's exporter and box count come from the run's lot metrics, so the
/// exclusion check agrees with every other consumer. Every such lot gets a
/// record, including `Normal` ones.
#[derive(Debug, Clone)]
pub struct ChargeTypeDetector {
    charge_type: String,
}

/// One lot's per-box cost for the selected charge type.
struct LotShare<'a> {
    lot: &'a LotCostMetric,
    cost_per_box: Decimal,
    in_baseline: bool,
}

impl ChargeTypeDetector {
    pub fn new(charge_type: &str) -> Result<Self, DetectorError> {
        let charge_type = normalize(charge_type);
        if charge_type.is_empty() {
            return Err(DetectorError::InvalidParameters(
                "charge type must not be blank".to_string(),
            ));
        }
        Ok(Self { charge_type })
    }

    /// Sums the selected charge type per lot. Rows whose lot is not in
    /// `metrics` are ignored; a row that would overflow its lot's sum is
    /// dropped with a warning.
    fn amounts_by_lot<'a>(
        &self,
        charges: &[ChargeRecord],
        metrics: &BTreeMap<&'a str, &'a LotCostMetric>,
    ) -> BTreeMap<&'a str, Decimal> {
        let mut amounts: BTreeMap<&'a str, Decimal> = BTreeMap::new();
        for charge in charges
            .iter()
            .filter(|c| normalize(&c.charge_type) == self.charge_type)
        {
            let Some(&lot) = metrics.get(charge.lot_id.trim()) else {
                continue;
            };
            let amount = amounts.entry(lot.lot_id()).or_insert(Decimal::ZERO);
            match amount.checked_add(charge.amount) {
                Some(sum) => *amount = sum,
                None => tracing::warn!(
                    lot_id = lot.lot_id(),
                    charge_type = %self.charge_type,
                    amount = %charge.amount,
                    "Charge-type total overflows; skipping row."
                ),
            }
        }
        amounts
    }

    /// One record per lot carrying the charge, largest absolute deviation
    /// first, lot id breaking ties.
    pub fn deviations(&self, ctx: &DetectionContext<'_>) -> Vec<ChargeTypeDeviationRecord> {
        let metrics: BTreeMap<&str, &LotCostMetric> =
            ctx.lots.iter().map(|lot| (lot.lot_id(), lot)).collect();

        let shares: Vec<LotShare<'_>> = self
            .amounts_by_lot(ctx.charges, &metrics)
            .into_iter()
            .filter_map(|(lot_id, amount)| {
                let lot = *metrics.get(lot_id)?;
                let boxes = lot.total_boxes();
                if boxes == 0 || amount <= Decimal::ZERO {
                    return None;
                }
                Some(LotShare {
                    lot,
                    cost_per_box: amount / Decimal::from(boxes),
                    in_baseline: !ctx.exclusions.is_exporter_excluded(lot.exporter()),
                })
            })
            .collect();

        let Some(average) = average(shares.iter().filter(|s| s.in_baseline).map(|s| s.cost_per_box))
        else {
            tracing::debug!(charge_type = %self.charge_type, "No lots carry this charge type.");
            return Vec::new();
        };

        let mut records: Vec<ChargeTypeDeviationRecord> = shares
            .into_iter()
            .filter_map(|share| {
                let Some(percentage_deviation) = percentage_deviation(share.cost_per_box, average)
                else {
                    tracing::warn!(
                        lot_id = share.lot.lot_id(),
                        cost_per_box = %share.cost_per_box,
                        average = %average,
                        "Charge-type deviation overflows; skipping lot."
                    );
                    return None;
                };
                Some(ChargeTypeDeviationRecord {
                    lot_id: share.lot.lot_id().to_string(),
                    exporter: share.lot.exporter().to_string(),
                    cost_per_box: share.cost_per_box,
                    percentage_deviation,
                    severity: tier(percentage_deviation.abs()),
                })
            })
            .collect();

        records.sort_by(|a, b| {
            b.percentage_deviation
                .abs()
                .cmp(&a.percentage_deviation.abs())
                .then_with(|| a.lot_id.cmp(&b.lot_id))
        });

        tracing::debug!(
            charge_type = %self.charge_type,
            lots = records.len(),
            average = %average,
            "Charge-type deviation scan complete."
        );
        records
    }
}

/// Mean of the values, `None` when there are none or their sum overflows.
fn average(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let mut count = 0u64;
    let mut sum = Decimal::ZERO;
    for value in values {
        sum = sum.checked_add(value)?;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    sum.checked_div(Decimal::from(count))
}

/// `(cost - average) / average * 100`, `None` on overflow or a zero average.
fn percentage_deviation(cost: Decimal, average: Decimal) -> Option<Decimal> {
    cost.checked_sub(average)?
        .checked_div(average)?
        .checked_mul(dec!(100))
}

/// Tiers an absolute percentage deviation.
pub fn tier(abs_pct: Decimal) -> DeviationTier {
    if abs_pct >= HIGH_PCT {
        DeviationTier::High
    } else if abs_pct >= MEDIUM_PCT {
        DeviationTier::Medium
    } else {
        DeviationTier::Normal
    }
}

impl Detector for ChargeTypeDetector {
    fn name(&self) -> &'static str {
        "charge_type"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Detection {
        Detection::ChargeType(self.deviations(ctx))
    }
}
