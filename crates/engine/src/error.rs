use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::ConfigError),

    #[error("Aggregation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Detector error: {0}")]
    Detector(#[from] detectors::DetectorError),
}
