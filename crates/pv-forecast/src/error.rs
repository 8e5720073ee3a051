//! Error types for forecast runs.

use pv_model::ConfigurationError;
use thiserror::Error;

/// Reasons a run produces no report at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Forecast run cancelled")]
    Cancelled,

    #[error("Worker failure: {message}")]
    Worker { message: String },
}

pub type ForecastResult<T> = Result<T, ForecastError>;
