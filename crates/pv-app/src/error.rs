//! Error types for the pv-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Weather source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("Plant not found: {0}")]
    PlantNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pv-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<pv_project::ProjectError> for AppError {
    fn from(err: pv_project::ProjectError) -> Self {
        match err {
            pv_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<pv_project::ValidationError> for AppError {
    fn from(err: pv_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<pv_weather::RegistryError> for AppError {
    fn from(err: pv_weather::RegistryError) -> Self {
        AppError::Source(err.to_string())
    }
}

impl From<pv_model::ConfigurationError> for AppError {
    fn from(err: pv_model::ConfigurationError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<pv_forecast::ForecastError> for AppError {
    fn from(err: pv_forecast::ForecastError) -> Self {
        match err {
            pv_forecast::ForecastError::Configuration(e) => e.into(),
            other => AppError::Forecast(other.to_string()),
        }
    }
}

impl From<pv_core::PvError> for AppError {
    fn from(err: pv_core::PvError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
