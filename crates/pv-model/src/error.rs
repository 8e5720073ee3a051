//! Error types for hardware resolution, plant construction and model runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareKind {
    Module,
    Inverter,
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareKind::Module => f.write_str("module"),
            HardwareKind::Inverter => f.write_str("inverter"),
        }
    }
}

/// Identifier not present in the hardware database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {identifier}")]
pub struct UnknownHardwareError {
    pub identifier: String,
    pub kind: HardwareKind,
}

/// Failure of one physical model invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelExecutionError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Invalid hardware: {what}")]
    InvalidHardware { what: String },

    #[error("Model output has {got} entries or foreign timestamps; expected {expected} aligned to the weather index")]
    MisalignedOutput { expected: usize, got: usize },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type ModelResult<T> = Result<T, ModelExecutionError>;

/// Fatal problems found while turning plant definitions into runnable models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Plant '{plant}': unknown {kind} '{identifier}'")]
    UnknownHardware {
        plant: String,
        identifier: String,
        kind: HardwareKind,
    },

    #[error("Plant '{plant}' is malformed: {reason}")]
    MalformedPlant { plant: String, reason: String },

    #[error("Plant '{plant}' references unknown site '{site}'")]
    UnknownSite { plant: String, site: String },

    #[error("Duplicate plant name: {plant}")]
    DuplicatePlant { plant: String },
}

impl ConfigurationError {
    pub fn malformed(plant: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::MalformedPlant {
            plant: plant.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unknown_hardware(plant: &str, err: UnknownHardwareError) -> Self {
        ConfigurationError::UnknownHardware {
            plant: plant.to_string(),
            identifier: err.identifier,
            kind: err.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_plant_and_identifier() {
        let err = ConfigurationError::unknown_hardware(
            "garage",
            UnknownHardwareError {
                identifier: "Acme_X1".into(),
                kind: HardwareKind::Inverter,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("garage"));
        assert!(msg.contains("Acme_X1"));
        assert!(msg.contains("inverter"));
    }

    #[test]
    fn model_error_display() {
        let err = ModelExecutionError::NonPhysical {
            what: "negative irradiance".into(),
        };
        assert!(err.to_string().contains("negative irradiance"));
    }
}
