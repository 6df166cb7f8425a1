use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How serious a finding is. The derived ordering is `Low < Medium < High`,
/// so sorting in descending order puts the most severe findings first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric rank used by reports: High=3, Medium=2, Low=1.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        };
        f.write_str(label)
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(CoreError::UnknownSeverity(s.to_string())),
        }
    }
}

/// The rule that produced a `ConsistencyIssue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    MissingExporter,
    InvalidCost,
    ExtremeStatisticalOutlier,
    StatisticalOutlier,
    MildStatisticalOutlier,
    InternalExporterInconsistency,
    DataInconsistency,
    MissingCharges,
    Consistent,
}

impl IssueKind {
    /// True for the three z-score tiers.
    pub fn is_statistical_outlier(&self) -> bool {
        matches!(
            self,
            IssueKind::ExtremeStatisticalOutlier
                | IssueKind::StatisticalOutlier
                | IssueKind::MildStatisticalOutlier
        )
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueKind::MissingExporter => "Missing exporter",
            IssueKind::InvalidCost => "Invalid cost",
            IssueKind::ExtremeStatisticalOutlier => "Extreme statistical outlier",
            IssueKind::StatisticalOutlier => "Statistical outlier",
            IssueKind::MildStatisticalOutlier => "Mild statistical outlier",
            IssueKind::InternalExporterInconsistency => "Internal exporter inconsistency",
            IssueKind::DataInconsistency => "Data inconsistency",
            IssueKind::MissingCharges => "Missing charges",
            IssueKind::Consistent => "Consistent",
        };
        f.write_str(label)
    }
}

/// CV classification used between exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CvClass {
    Excellent,
    Good,
    Acceptable,
    Poor,
    VeryInconsistent,
}

impl CvClass {
    /// Upper bounds are inclusive: a CV of exactly 10.0 is still `Excellent`.
    pub fn from_cv(cv: f64) -> Self {
        if cv <= 10.0 {
            CvClass::Excellent
        } else if cv <= 15.0 {
            CvClass::Good
        } else if cv <= 20.0 {
            CvClass::Acceptable
        } else if cv <= 25.0 {
            CvClass::Poor
        } else {
            CvClass::VeryInconsistent
        }
    }
}

impl fmt::Display for CvClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CvClass::Excellent => "Excellent",
            CvClass::Good => "Good",
            CvClass::Acceptable => "Acceptable",
            CvClass::Poor => "Poor",
            CvClass::VeryInconsistent => "Very Inconsistent",
        };
        f.write_str(label)
    }
}

/// CV classification used when annotating a single lot against its own
/// exporter. It is deliberately stricter than `CvClass` and the two scales
/// must not be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternalCvClass {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl InternalCvClass {
    pub fn from_cv(cv: f64) -> Self {
        if cv <= 5.0 {
            InternalCvClass::Excellent
        } else if cv <= 10.0 {
            InternalCvClass::Good
        } else if cv <= 15.0 {
            InternalCvClass::Acceptable
        } else {
            InternalCvClass::Poor
        }
    }
}

impl fmt::Display for InternalCvClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InternalCvClass::Excellent => "Excellent",
            InternalCvClass::Good => "Good",
            InternalCvClass::Acceptable => "Acceptable",
            InternalCvClass::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Which side of the mean an outlier sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    High,
    Low,
}

/// Tier of a charge-type percentage deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviationTier {
    Normal,
    Medium,
    High,
}

impl fmt::Display for DeviationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviationTier::Normal => "NORMAL",
            DeviationTier::Medium => "MEDIUM",
            DeviationTier::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// An exporter's average cost relative to the market average. "Below market"
/// means the exporter is cheaper than the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceCategory {
    SignificantlyBelowMarket,
    BelowMarket,
    MarketAverage,
    AboveMarket,
    SignificantlyAboveMarket,
}

impl PerformanceCategory {
    /// Buckets `(global_mean - exporter_mean) / global_mean * 100`.
    pub fn from_pct(pct: f64) -> Self {
        if pct > 20.0 {
            PerformanceCategory::SignificantlyBelowMarket
        } else if pct > 10.0 {
            PerformanceCategory::BelowMarket
        } else if pct < -20.0 {
            PerformanceCategory::SignificantlyAboveMarket
        } else if pct < -10.0 {
            PerformanceCategory::AboveMarket
        } else {
            PerformanceCategory::MarketAverage
        }
    }
}

impl fmt::Display for PerformanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceCategory::SignificantlyBelowMarket => "Significantly Below Market",
            PerformanceCategory::BelowMarket => "Below Market",
            PerformanceCategory::MarketAverage => "Market Average",
            PerformanceCategory::AboveMarket => "Above Market",
            PerformanceCategory::SignificantlyAboveMarket => "Significantly Above Market",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::High.rank(), 3);
        assert_eq!(Severity::Low.rank(), 1);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("High".parse::<Severity>(), Ok(Severity::High));
        assert_eq!(" medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert_eq!(
            "urgent".parse::<Severity>(),
            Err(CoreError::UnknownSeverity("urgent".to_string()))
        );
    }

    #[test]
    fn external_cv_class_boundaries_are_inclusive() {
        assert_eq!(CvClass::from_cv(0.0), CvClass::Excellent);
        assert_eq!(CvClass::from_cv(10.0), CvClass::Excellent);
        assert_eq!(CvClass::from_cv(10.0001), CvClass::Good);
        assert_eq!(CvClass::from_cv(15.0), CvClass::Good);
        assert_eq!(CvClass::from_cv(15.0001), CvClass::Acceptable);
        assert_eq!(CvClass::from_cv(20.0), CvClass::Acceptable);
        assert_eq!(CvClass::from_cv(20.0001), CvClass::Poor);
        assert_eq!(CvClass::from_cv(25.0), CvClass::Poor);
        assert_eq!(CvClass::from_cv(25.0001), CvClass::VeryInconsistent);
    }

    #[test]
    fn internal_cv_class_uses_its_own_scale() {
        assert_eq!(InternalCvClass::from_cv(5.0), InternalCvClass::Excellent);
        assert_eq!(InternalCvClass::from_cv(5.0001), InternalCvClass::Good);
        assert_eq!(InternalCvClass::from_cv(10.0), InternalCvClass::Good);
        assert_eq!(InternalCvClass::from_cv(10.0001), InternalCvClass::Acceptable);
        assert_eq!(InternalCvClass::from_cv(15.0), InternalCvClass::Acceptable);
        assert_eq!(InternalCvClass::from_cv(15.0001), InternalCvClass::Poor);
        // 10.0 is Excellent between exporters but only Good within one.
        assert_eq!(CvClass::from_cv(10.0), CvClass::Excellent);
        assert_eq!(InternalCvClass::from_cv(10.0), InternalCvClass::Good);
    }

    #[test]
    fn performance_buckets_use_sign_for_direction() {
        assert_eq!(
            PerformanceCategory::from_pct(25.0),
            PerformanceCategory::SignificantlyBelowMarket
        );
        assert_eq!(PerformanceCategory::from_pct(20.0), PerformanceCategory::BelowMarket);
        assert_eq!(PerformanceCategory::from_pct(10.0), PerformanceCategory::MarketAverage);
        assert_eq!(PerformanceCategory::from_pct(-10.0), PerformanceCategory::MarketAverage);
        assert_eq!(PerformanceCategory::from_pct(-15.0), PerformanceCategory::AboveMarket);
        assert_eq!(
            PerformanceCategory::from_pct(-20.5),
            PerformanceCategory::SignificantlyAboveMarket
        );
    }
}
