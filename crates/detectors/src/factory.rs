use crate::charge_type::ChargeTypeDetector;
use crate::error::DetectorError;
use crate::internal::InternalDetector;
use crate::population::PopulationDetector;
use crate::{Detector, DetectorKind};

/// Creates a new detector instance for the given scheme.
pub fn create_detector(kind: &DetectorKind) -> Result<Box<dyn Detector>, DetectorError> {
    // The compiler will error if a new DetectorKind is added but not handled here.
    match kind {
        DetectorKind::Internal => Ok(Box::new(InternalDetector::new())),
        DetectorKind::Population => Ok(Box::new(PopulationDetector::new())),
        DetectorKind::ChargeType { charge_type } => {
            Ok(Box::new(ChargeTypeDetector::new(charge_type)?))
        }
    }
}
