//! Error types for weather retrieval and conversion.

use pv_core::Timestamp;
use std::time::Duration;
use thiserror::Error;

/// A weather record that cannot be completed into irradiance + precipitable water.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Incomplete weather data at {timestamp}: {field} ({reason})")]
pub struct DataIncompleteError {
    pub timestamp: Timestamp,
    pub field: &'static str,
    pub reason: &'static str,
}

impl DataIncompleteError {
    pub fn new(timestamp: Timestamp, field: &'static str, reason: &'static str) -> Self {
        Self {
            timestamp,
            field,
            reason,
        }
    }
}

/// Why a source produced no usable series for a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnavailableReason {
    #[error("I/O failure: {message}")]
    Io { message: String },

    #[error("Parse failure: {message}")]
    Parse { message: String },

    #[error("Timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("No records in the requested range")]
    Empty,

    #[error("Every record was incomplete; first: {first}")]
    Incomplete { first: DataIncompleteError },
}

/// Any I/O, parse, timeout or data fault of a weather source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Weather source '{source_name}' unavailable: {reason}")]
pub struct SourceUnavailableError {
    pub source_name: String,
    pub reason: UnavailableReason,
}

impl SourceUnavailableError {
    pub fn new(source_name: impl Into<String>, reason: UnavailableReason) -> Self {
        Self {
            source_name: source_name.into(),
            reason,
        }
    }

    pub fn io(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::new(
            source_name,
            UnavailableReason::Io {
                message: message.to_string(),
            },
        )
    }

    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::new(
            source_name,
            UnavailableReason::Parse {
                message: message.to_string(),
            },
        )
    }
}

pub type SourceResult<T> = Result<T, SourceUnavailableError>;

/// Failures building a source from configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown weather source type: {kind}")]
    UnknownType { kind: String },

    #[error("Invalid option '{option}' for source '{source_name}': {reason}")]
    InvalidOption {
        source_name: String,
        option: String,
        reason: String,
    },
}
