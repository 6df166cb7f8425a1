use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DetectorError {
    #[error("Detector received invalid parameters: {0}")]
    InvalidParameters(String),
}
