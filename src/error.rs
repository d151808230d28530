use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("similarity tolerance must be finite and >= 0, got {0}")]
    InvalidTolerance(f64),

    #[error("minimum matched markets must be at least 1")]
    ZeroMinimumMarkets,

    #[error("feed timezone offset must be between -12 and 14 hours, got {0}")]
    InvalidTimezoneOffset(i64),
}
