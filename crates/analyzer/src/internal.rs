//! Internal (within-population) consistency analysis.
//!
//! Every lot runs through an ordered list of independent rules. Rules are
//! additive: a lot can be both "missing exporter" and "data inconsistency".
//! The single exception is the exporter-variability rule, which only fires
//! when no earlier rule produced an issue for the lot. A lot that trips no
//! rule at all gets exactly one `Consistent` record.

use analytics::PopulationStats;
use core_types::{ConsistencyIssue, InternalCvClass, IssueKind, LotCostMetric, Severity};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// z above which a lot is an extreme outlier.
const EXTREME_OUTLIER_Z: f64 = 2.5;
/// z above which a lot is an outlier.
const OUTLIER_Z: f64 = 2.0;
/// z above which a lot is a mild outlier.
const MILD_OUTLIER_Z: f64 = 1.8;
/// Exporter CV (%) above which the exporter's own lots are considered erratic.
const EXPORTER_CV_LIMIT: f64 = 25.0;

/// Everything a rule needs to know about one lot.
struct LotContext<'a> {
    lot: &'a LotCostMetric,
    global: &'a PopulationStats,
    exporter: PopulationStats,
}

impl LotContext<'_> {
    fn issue(&self, kind: IssueKind, severity: Severity, description: String) -> ConsistencyIssue {
        ConsistencyIssue {
            lot_id: self.lot.lot_id().to_string(),
            exporter: self.lot.exporter().to_string(),
            kind,
            severity,
            description,
            cost_per_box: self.lot.cost_per_box(),
            total_charges: self.lot.total_charge_amount(),
        }
    }

    /// z-score of the lot against the global population, when defined.
    fn z_score(&self) -> Option<f64> {
        let cost = self.lot.cost_per_box_f64()?;
        (self.global.std_dev > 0.0).then(|| self.global.z_score(cost))
    }
}

/// A rule sees the lot and the issues already raised for it.
type Rule = fn(&LotContext, &[ConsistencyIssue]) -> Option<ConsistencyIssue>;

/// Evaluation order matters only for `exporter_inconsistency`.
const RULES: [Rule; 5] = [
    missing_exporter,
    invalid_cost,
    statistical_outlier,
    exporter_inconsistency,
    charge_total_mismatch,
];

/// Runs every rule over every lot.
///
/// The output is sorted by severity, most severe first. Ties keep the order
/// of `lots`.
pub fn analyze(
    lots: &[LotCostMetric],
    global: &PopulationStats,
    exporter_stats: &BTreeMap<String, PopulationStats>,
) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    for lot in lots {
        let ctx = LotContext {
            lot,
            global,
            exporter: exporter_stats.get(lot.exporter()).copied().unwrap_or_default(),
        };

        let mut lot_issues: Vec<ConsistencyIssue> = Vec::new();
        for rule in RULES {
            if let Some(issue) = rule(&ctx, &lot_issues) {
                lot_issues.push(issue);
            }
        }

        if lot_issues.is_empty() {
            lot_issues.push(consistent(&ctx));
        }
        issues.extend(lot_issues);
    }

    issues.sort_by(|a, b| b.severity.cmp(&a.severity));

    tracing::debug!(
        lots = lots.len(),
        high = issues.iter().filter(|i| i.severity == Severity::High).count(),
        medium = issues.iter().filter(|i| i.severity == Severity::Medium).count(),
        "Internal consistency analysis complete."
    );

    issues
}

fn missing_exporter(ctx: &LotContext, _prior: &[ConsistencyIssue]) -> Option<ConsistencyIssue> {
    ctx.lot.is_exporter_missing().then(|| {
        ctx.issue(
            IssueKind::MissingExporter,
            Severity::High,
            "Lot has no exporter assigned".to_string(),
        )
    })
}

fn invalid_cost(ctx: &LotContext, _prior: &[ConsistencyIssue]) -> Option<ConsistencyIssue> {
    let description = match ctx.lot.cost_per_box() {
        None => "Cost per box cannot be computed: lot has no boxes".to_string(),
        Some(cost) if cost.is_zero() => "Cost per box is zero".to_string(),
        Some(_) => return None,
    };
    Some(ctx.issue(IssueKind::InvalidCost, Severity::High, description))
}

fn statistical_outlier(ctx: &LotContext, _prior: &[ConsistencyIssue]) -> Option<ConsistencyIssue> {
    let z = ctx.z_score()?;

    let (kind, severity) = if z > EXTREME_OUTLIER_Z {
        (IssueKind::ExtremeStatisticalOutlier, Severity::High)
    } else if z > OUTLIER_Z {
        (IssueKind::StatisticalOutlier, Severity::Medium)
    } else if z > MILD_OUTLIER_Z {
        (IssueKind::MildStatisticalOutlier, Severity::Low)
    } else {
        return None;
    };

    let description = format!(
        "Cost per box {:.4} is {:.2}σ from the population mean {:.4} (exporter CV {:.1}%)",
        ctx.lot.cost_per_box_f64().unwrap_or_default(),
        z,
        ctx.global.mean,
        ctx.exporter.cv,
    );
    Some(ctx.issue(kind, severity, description))
}

fn exporter_inconsistency(ctx: &LotContext, prior: &[ConsistencyIssue]) -> Option<ConsistencyIssue> {
    if !prior.is_empty() || ctx.exporter.cv <= EXPORTER_CV_LIMIT {
        return None;
    }
    let description = format!(
        "Exporter's own lots vary widely (CV {:.1}% > {:.0}%)",
        ctx.exporter.cv, EXPORTER_CV_LIMIT
    );
    Some(ctx.issue(
        IssueKind::InternalExporterInconsistency,
        Severity::High,
        description,
    ))
}

fn charge_total_mismatch(ctx: &LotContext, _prior: &[ConsistencyIssue]) -> Option<ConsistencyIssue> {
    let cost = ctx.lot.cost_per_box().unwrap_or(Decimal::ZERO);
    let total = ctx.lot.total_charge_amount();

    if cost > Decimal::ZERO && total.is_zero() {
        Some(ctx.issue(
            IssueKind::DataInconsistency,
            Severity::High,
            format!("Cost per box is {cost} but the lot has no charge total"),
        ))
    } else if cost.is_zero() && total.is_zero() {
        Some(ctx.issue(
            IssueKind::MissingCharges,
            Severity::Medium,
            "Lot has no charges and no cost".to_string(),
        ))
    } else {
        None
    }
}

fn consistent(ctx: &LotContext) -> ConsistencyIssue {
    let z = ctx.z_score().unwrap_or(0.0);
    let class = InternalCvClass::from_cv(ctx.exporter.cv);
    ctx.issue(
        IssueKind::Consistent,
        Severity::Low,
        format!(
            "Within expected range (z = {:.2}); exporter CV {:.1}% ({})",
            z, ctx.exporter.cv, class
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stats(mean: f64, std_dev: f64) -> PopulationStats {
        PopulationStats {
            count: 10,
            mean,
            std_dev,
            cv: if mean > 0.0 { std_dev * 100.0 / mean } else { 0.0 },
        }
    }

    fn exporter_cv(exporter: &str, cv: f64) -> BTreeMap<String, PopulationStats> {
        BTreeMap::from([(
            exporter.to_string(),
            PopulationStats {
                count: 3,
                mean: 2.0,
                std_dev: cv * 2.0 / 100.0,
                cv,
            },
        )])
    }

    fn kinds(issues: &[ConsistencyIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    /// A lot whose cost per box equals `cost` with 100 boxes.
    fn lot(id: &str, exporter: &str, cost: Decimal) -> LotCostMetric {
        LotCostMetric::new(id, exporter, cost * dec!(100), 100)
    }

    #[test]
    fn extreme_outlier_at_three_sigma() {
        let issues = analyze(&[lot("L1", "X", dec!(3.5))], &stats(2.0, 0.5), &exporter_cv("X", 4.0));

        assert_eq!(kinds(&issues), vec![IssueKind::ExtremeStatisticalOutlier]);
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues[0].description.contains("exporter CV 4.0%"));
    }

    #[test]
    fn z_tiers_are_strictly_greater_than() {
        let global = stats(2.0, 1.0);
        let exporters = exporter_cv("X", 4.0);
        let tier = |cost: Decimal| kinds(&analyze(&[lot("L", "X", cost)], &global, &exporters));

        assert_eq!(tier(dec!(4.5)), vec![IssueKind::StatisticalOutlier]);
        assert_eq!(tier(dec!(4.51)), vec![IssueKind::ExtremeStatisticalOutlier]);
        assert_eq!(tier(dec!(4.0)), vec![IssueKind::MildStatisticalOutlier]);
        assert_eq!(tier(dec!(4.01)), vec![IssueKind::StatisticalOutlier]);
        assert_eq!(tier(dec!(3.8)), vec![IssueKind::Consistent]);
        assert_eq!(tier(dec!(3.81)), vec![IssueKind::MildStatisticalOutlier]);
    }

    #[test]
    fn zero_boxes_is_invalid_cost() {
        let metric = LotCostMetric::new("L2", "X", dec!(120), 0);
        let issues = analyze(&[metric], &stats(2.0, 0.5), &exporter_cv("X", 4.0));

        assert_eq!(kinds(&issues), vec![IssueKind::InvalidCost]);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].cost_per_box, None);
    }

    #[test]
    fn missing_exporter_and_data_inconsistency_are_additive() {
        let metric = LotCostMetric::from_parts("L3", " ", dec!(0), 10, Some(dec!(2)));
        let issues = analyze(&[metric], &stats(2.0, 0.5), &BTreeMap::new());

        assert_eq!(
            kinds(&issues),
            vec![IssueKind::MissingExporter, IssueKind::DataInconsistency]
        );
    }

    #[test]
    fn no_charges_and_no_boxes() {
        let metric = LotCostMetric::new("L4", "X", dec!(0), 0);
        let issues = analyze(&[metric], &stats(2.0, 0.5), &exporter_cv("X", 4.0));

        // InvalidCost (High) sorts ahead of MissingCharges (Medium).
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::InvalidCost, IssueKind::MissingCharges]
        );
    }

    #[test]
    fn exporter_variability_fires_only_without_prior_issue() {
        let exporters = exporter_cv("X", 30.0);
        let global = stats(2.0, 0.5);

        let in_range = analyze(&[lot("L5", "X", dec!(2.1))], &global, &exporters);
        assert_eq!(kinds(&in_range), vec![IssueKind::InternalExporterInconsistency]);

        let outlier = analyze(&[lot("L6", "X", dec!(3.5))], &global, &exporters);
        assert_eq!(kinds(&outlier), vec![IssueKind::ExtremeStatisticalOutlier]);
    }

    #[test]
    fn exporter_cv_of_exactly_25_is_tolerated() {
        let issues = analyze(&[lot("L7", "X", dec!(2))], &stats(2.0, 0.5), &exporter_cv("X", 25.0));
        assert_eq!(kinds(&issues), vec![IssueKind::Consistent]);
    }

    #[test]
    fn consistent_lot_gets_one_low_record_with_internal_class() {
        let issues = analyze(&[lot("L8", "X", dec!(2.2))], &stats(2.0, 0.5), &exporter_cv("X", 10.0));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Consistent);
        assert_eq!(issues[0].severity, Severity::Low);
        assert!(issues[0].description.contains("z = 0.40"));
        assert!(issues[0].description.contains("(Good)"));
    }

    #[test]
    fn no_spread_skips_the_z_rule() {
        let issues = analyze(&[lot("L9", "X", dec!(99))], &stats(10.0, 0.0), &exporter_cv("X", 0.0));
        assert_eq!(kinds(&issues), vec![IssueKind::Consistent]);
    }

    #[test]
    fn output_is_sorted_by_severity_keeping_lot_order_for_ties() {
        let lots = vec![
            lot("A", "X", dec!(2)),
            LotCostMetric::new("B", "X", dec!(10), 0),
            lot("C", "X", dec!(2)),
            LotCostMetric::new("D", "X", dec!(10), 0),
        ];
        let issues = analyze(&lots, &stats(2.0, 0.5), &exporter_cv("X", 4.0));

        let order: Vec<&str> = issues.iter().map(|i| i.lot_id.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        assert!(issues.windows(2).all(|w| w[0].severity >= w[1].severity));
    }
}
