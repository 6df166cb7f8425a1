use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Unknown severity label: {0}")]
    UnknownSeverity(String),
}
