use analytics::StatsBaseline;
use core_types::{
    ConsistencyIssue, ExporterConsistencyResult, IssueKind, LotCostMetric, OutlierRecord, Severity,
};
use serde::Serialize;

/// Everything one analysis run produces.
///
/// Every list is explicitly ordered, so serialising the same input twice
/// yields byte-identical output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// One metric per lot, ordered by lot id.
    pub lots: Vec<LotCostMetric>,
    pub baseline: StatsBaseline,
    /// Most severe first.
    pub internal_issues: Vec<ConsistencyIssue>,
    /// Most severe first, then furthest from the market.
    pub exporter_results: Vec<ExporterConsistencyResult>,
    /// Largest deviation first.
    pub population_outliers: Vec<OutlierRecord>,
    pub summary: ReportSummary,
}

/// Headline counts for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    pub lots: usize,
    pub lots_without_cost: usize,
    pub consistent_lots: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
    /// Lots flagged by any of the z-score tiers.
    pub statistical_outliers: usize,
    pub exporters: usize,
    pub population_outliers: usize,
}

impl ReportSummary {
    pub fn tally(
        lots: &[LotCostMetric],
        issues: &[ConsistencyIssue],
        exporters: &[ExporterConsistencyResult],
        outliers: &[OutlierRecord],
    ) -> Self {
        let count = |severity: Severity| {
            issues
                .iter()
                .filter(|i| i.kind != IssueKind::Consistent && i.severity == severity)
                .count()
        };

        Self {
            lots: lots.len(),
            lots_without_cost: lots.iter().filter(|l| l.cost_per_box().is_none()).count(),
            consistent_lots: issues
                .iter()
                .filter(|i| i.kind == IssueKind::Consistent)
                .count(),
            high_issues: count(Severity::High),
            medium_issues: count(Severity::Medium),
            low_issues: count(Severity::Low),
            statistical_outliers: issues
                .iter()
                .filter(|i| i.kind.is_statistical_outlier())
                .count(),
            exporters: exporters.len(),
            population_outliers: outliers.len(),
        }
    }
}

impl ConsistencyReport {
    /// Issues at or above `min`, excluding `Consistent` records.
    pub fn issues_at_least(&self, min: Severity) -> impl Iterator<Item = &ConsistencyIssue> {
        self.internal_issues
            .iter()
            .filter(move |i| i.kind != IssueKind::Consistent && i.severity >= min)
    }
}
