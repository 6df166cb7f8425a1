use crate::{Detection, DetectionContext, Detector};
use core_types::{Direction, OutlierRecord};
use std::cmp::Ordering;

/// Lots further than this many sigmas from the population mean are outliers.
const OUTLIER_SIGMA: f64 = 2.0;

/// Flags every lot outside the population-wide 2σ band.
///
/// Single tier: a lot either is an outlier or is not. The band comes from the
/// shared global baseline (excluded exporters do not shape it), but lots of
/// excluded exporters are still checked against it.
#[derive(Debug, Default)]
pub struct PopulationDetector {}

impl PopulationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The outliers, largest deviation first, lot id breaking ties.
    pub fn outliers(&self, ctx: &DetectionContext<'_>) -> Vec<OutlierRecord> {
        let global = &ctx.baseline.global;
        if global.std_dev <= 0.0 {
            return Vec::new();
        }

        let mut outliers: Vec<OutlierRecord> = ctx
            .lots
            .iter()
            .filter(|lot| lot.has_positive_cost())
            .filter_map(|lot| {
                let cost = lot.cost_per_box()?;
                let x = lot.cost_per_box_f64()?;
                if (x - global.mean).abs() <= OUTLIER_SIGMA * global.std_dev {
                    return None;
                }
                Some(OutlierRecord {
                    lot_id: lot.lot_id().to_string(),
                    exporter: lot.exporter().to_string(),
                    cost_per_box: cost,
                    deviation_sigma: global.z_score(x),
                    direction: if x > global.mean {
                        Direction::High
                    } else {
                        Direction::Low
                    },
                })
            })
            .collect();

        outliers.sort_by(|a, b| {
            b.deviation_sigma
                .partial_cmp(&a.deviation_sigma)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.lot_id.cmp(&b.lot_id))
        });

        tracing::debug!(outliers = outliers.len(), "Population outlier scan complete.");
        outliers
    }
}

impl Detector for PopulationDetector {
    fn name(&self) -> &'static str {
        "population"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Detection {
        Detection::Population(self.outliers(ctx))
    }
}
