use configuration::Exclusions;
use core_types::LotCostMetric;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean, standard deviation and coefficient of variation of a sample.
///
/// Variance uses the population divisor `N`, never `N - 1`. Every threshold
/// downstream is calibrated against that choice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PopulationStats {
    /// Number of values that survived filtering.
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// `std_dev / mean * 100`, or `0` when the mean is not positive.
    pub cv: f64,
}

impl PopulationStats {
    /// `|x - mean| / std_dev`, or `0` when there is no spread.
    pub fn z_score(&self, x: f64) -> f64 {
        if self.std_dev > 0.0 {
            (x - self.mean).abs() / self.std_dev
        } else {
            0.0
        }
    }
}

/// Computes population statistics, ignoring non-positive and non-finite values.
pub fn compute_stats<I>(values: I) -> PopulationStats
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();

    if values.is_empty() {
        return PopulationStats::default();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    // Multiply before dividing so round figures stay exact (sd 1, mean 10 -> 10.0).
    let cv = if mean > 0.0 { std_dev * 100.0 / mean } else { 0.0 };

    PopulationStats {
        count: values.len(),
        mean,
        std_dev,
        cv,
    }
}

/// Statistics over the per-box costs of a set of lots.
pub fn lot_cost_stats<'a, I>(lots: I) -> PopulationStats
where
    I: IntoIterator<Item = &'a LotCostMetric>,
{
    compute_stats(lots.into_iter().filter_map(|l| l.cost_per_box_f64()))
}

/// The statistics every analyzer of one run shares.
///
/// Built once per run so that the internal analyzer, the external analyzer
/// and the population outlier detector all measure against the same numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatsBaseline {
    /// Over every lot with a positive cost whose exporter is not excluded.
    pub global: PopulationStats,
    /// Over each exporter's own lots. Excluded exporters are present here;
    /// lots without an exporter are not.
    pub by_exporter: BTreeMap<String, PopulationStats>,
}

impl StatsBaseline {
    pub fn build(lots: &[LotCostMetric], exclusions: &Exclusions) -> Self {
        let global = lot_cost_stats(
            lots.iter()
                .filter(|l| !exclusions.is_exporter_excluded(l.exporter())),
        );

        let by_exporter = crate::engine::group_by_exporter(lots)
            .into_iter()
            .filter(|(exporter, _)| !exporter.trim().is_empty())
            .map(|(exporter, group)| (exporter.to_string(), lot_cost_stats(group)))
            .collect();

        tracing::debug!(
            lots = global.count,
            mean = global.mean,
            std_dev = global.std_dev,
            cv = global.cv,
            "Built global cost baseline."
        );

        Self {
            global,
            by_exporter,
        }
    }

    /// The exporter's statistics, or all zeros for an unknown exporter.
    pub fn exporter(&self, exporter: &str) -> PopulationStats {
        self.by_exporter.get(exporter).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn uses_population_variance() {
        // Sample variance would give 2.0 / 1 = 2.0; population gives 1.0.
        let stats = compute_stats([9.0, 11.0]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std_dev, 1.0);
        assert_eq!(stats.cv, 10.0);
    }

    #[test]
    fn ignores_non_positive_and_non_finite_values() {
        let stats = compute_stats([0.0, -3.0, f64::NAN, 4.0, f64::INFINITY]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.cv, 0.0);
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(compute_stats(Vec::new()), PopulationStats::default());
    }

    #[test]
    fn identical_values_have_no_spread() {
        let stats = compute_stats([10.0, 10.0, 10.0]);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.cv, 0.0);
        assert_eq!(stats.z_score(50.0), 0.0);
    }

    #[test]
    fn z_score_is_absolute() {
        let stats = PopulationStats {
            count: 10,
            mean: 2.0,
            std_dev: 0.5,
            cv: 25.0,
        };
        assert_eq!(stats.z_score(3.5), 3.0);
        assert_eq!(stats.z_score(0.5), 3.0);
    }

    #[test]
    fn baseline_drops_excluded_exporters_from_global_only() {
        let lots = vec![
            LotCostMetric::new("L1", "A", dec!(100), 100),
            LotCostMetric::new("L2", "A", dec!(300), 100),
            LotCostMetric::new("L3", "DIST", dec!(5000), 100),
            LotCostMetric::new("L4", "", dec!(100), 100),
        ];
        let exclusions = Exclusions::new(&[], &["dist"]).expect("valid exclusions");

        let baseline = StatsBaseline::build(&lots, &exclusions);

        // L1, L2 and L4 (no exporter, but not excluded) form the global population.
        assert_eq!(baseline.global.count, 3);
        assert!(baseline.by_exporter.contains_key("DIST"));
        assert!(!baseline.by_exporter.contains_key(""));
        assert_eq!(baseline.exporter("A").mean, 2.0);
        assert_eq!(baseline.exporter("UNKNOWN"), PopulationStats::default());
    }
}
