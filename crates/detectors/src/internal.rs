use crate::{Detection, DetectionContext, Detector};
use core_types::ConsistencyIssue;

/// The per-lot consistency rules exposed as a detector.
#[derive(Debug, Default)]
pub struct InternalDetector {}

impl InternalDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self, ctx: &DetectionContext<'_>) -> Vec<ConsistencyIssue> {
        analyzer::analyze(ctx.lots, &ctx.baseline.global, &ctx.baseline.by_exporter)
    }
}

impl Detector for InternalDetector {
    fn name(&self) -> &'static str {
        "internal"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Detection {
        Detection::Internal(self.issues(ctx))
    }
}
