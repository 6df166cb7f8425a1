//! External (between-exporter) consistency analysis.

use analytics::{PopulationStats, StatsBaseline, group_by_exporter};
use configuration::Exclusions;
use core_types::{
    CvClass, ExporterConsistencyResult, LotCostMetric, PerformanceCategory, Severity,
};
use rust_decimal::Decimal;
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Severity thresholds
// ---------------------------------------------------------------------------

/// Exporter mean more than this many global sigmas away: High.
const SIGMA_HIGH: f64 = 2.5;
/// ...: Medium.
const SIGMA_MEDIUM: f64 = 2.0;
/// ...: Low.
const SIGMA_LOW: f64 = 1.5;
/// Exporter CV (%) above which severity is High.
const CV_HIGH: f64 = 25.0;
/// Exporter CV (%) above which severity is Medium.
const CV_MEDIUM: f64 = 20.0;
/// Below this many valid lots the statistics get a sample-size note.
const MIN_RELIABLE_SAMPLE: usize = 5;

/// Compares every exporter against the market, building its own baseline.
pub fn analyze_external(
    lots: &[LotCostMetric],
    exclusions: &Exclusions,
) -> Vec<ExporterConsistencyResult> {
    let baseline = StatsBaseline::build(lots, exclusions);
    analyze_external_with_baseline(lots, exclusions, &baseline)
}

/// Compares every exporter against the market using a baseline shared with
/// the rest of the run.
///
/// Excluded exporters, lots without an exporter and exporters with no lot of
/// positive cost produce no result. Output is ordered by severity, then by
/// deviation from the market, then by exporter name.
pub fn analyze_external_with_baseline(
    lots: &[LotCostMetric],
    exclusions: &Exclusions,
    baseline: &StatsBaseline,
) -> Vec<ExporterConsistencyResult> {
    let global = &baseline.global;
    let mut results = Vec::new();

    for (exporter, group) in group_by_exporter(lots) {
        if exporter.trim().is_empty() || exclusions.is_exporter_excluded(exporter) {
            continue;
        }

        let stats = baseline.exporter(exporter);
        if stats.count == 0 {
            tracing::warn!(exporter, lots = group.len(), "Exporter has no lot with a usable cost; skipping.");
            continue;
        }

        results.push(evaluate_exporter(exporter, &group, &stats, global));
    }

    results.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                b.deviation_from_global_sigma
                    .partial_cmp(&a.deviation_from_global_sigma)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.exporter.cmp(&b.exporter))
    });

    results
}

/// Severity from the exporter's distance to the market mean, in global sigmas.
/// Each threshold must be strictly exceeded.
fn sigma_severity(deviation: f64) -> Option<Severity> {
    if deviation > SIGMA_HIGH {
        Some(Severity::High)
    } else if deviation > SIGMA_MEDIUM {
        Some(Severity::Medium)
    } else if deviation > SIGMA_LOW {
        Some(Severity::Low)
    } else {
        None
    }
}

/// Severity from the exporter's own CV (%). Moderate variability alone is
/// not a finding.
fn cv_severity(cv: f64) -> Option<Severity> {
    if cv > CV_HIGH {
        Some(Severity::High)
    } else if cv > CV_MEDIUM {
        Some(Severity::Medium)
    } else {
        None
    }
}

fn evaluate_exporter(
    exporter: &str,
    group: &[&LotCostMetric],
    stats: &PopulationStats,
    global: &PopulationStats,
) -> ExporterConsistencyResult {
    let deviation = if global.std_dev > 0.0 {
        (stats.mean - global.mean).abs() / global.std_dev
    } else {
        0.0
    };

    let mut issues = Vec::new();

    let by_sigma = sigma_severity(deviation);
    if by_sigma.is_some() {
        issues.push(format!(
            "Average cost per box deviates {deviation:.2}σ from the market average"
        ));
    }

    let by_cv = cv_severity(stats.cv);
    if by_cv.is_some() {
        issues.push(format!("High cost variability across lots (CV {:.1}%)", stats.cv));
    }

    if stats.count < MIN_RELIABLE_SAMPLE {
        issues.push(format!(
            "Limited sample size ({} lot(s)); statistics may be unreliable",
            stats.count
        ));
    }

    let performance_vs_market_pct = if global.mean > 0.0 {
        (global.mean - stats.mean) / global.mean * 100.0
    } else {
        0.0
    };

    ExporterConsistencyResult {
        exporter: exporter.to_string(),
        total_lots: group.len(),
        valid_lots: stats.count,
        total_charge_amount: group
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.total_charge_amount())),
        total_boxes: group.iter().map(|l| l.total_boxes()).sum(),
        avg_cost_per_box: stats.mean,
        std_deviation: stats.std_dev,
        cv: stats.cv,
        classification: CvClass::from_cv(stats.cv),
        // Neither signal firing still leaves the baseline Low.
        severity: by_sigma.max(by_cv).unwrap_or(Severity::Low),
        issues,
        deviation_from_global_sigma: deviation,
        performance_vs_market_pct,
        performance_category: PerformanceCategory::from_pct(performance_vs_market_pct),
    }
}
