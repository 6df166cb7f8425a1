use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AnalyticsError {
    #[error("The charge feed is empty but the stock feed lists {0} lot(s)")]
    EmptyChargeFeed(usize),
}
