//! Plant definitions: arrays, inverter references and topology.

use serde::{Deserialize, Serialize};

use crate::{Location, PowerSeries};

fn default_count() -> u32 {
    1
}

/// Reference to an inverter model in the hardware database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterRef {
    pub model: String,
    /// Physical inverter units of this model. Only micro plants use more than one.
    #[serde(default = "default_count")]
    pub nr_inverters: u32,
}

impl InverterRef {
    pub fn new(model: impl Into<String>, nr_inverters: u32) -> Self {
        Self {
            model: model.into(),
            nr_inverters,
        }
    }
}

/// One tilted/oriented group of modules.
///
/// For micro plants `modules_per_string` is the number of modules behind each
/// inverter unit and `strings` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySpec {
    pub name: String,
    /// Degrees from horizontal, 0..=90
    pub tilt: f64,
    /// Degrees clockwise from north, 0..=360
    pub azimuth: f64,
    pub module: String,
    #[serde(default = "default_count")]
    pub modules_per_string: u32,
    #[serde(default = "default_count")]
    pub strings: u32,
    pub inverter: InverterRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Topology {
    /// One inverter model run across all arrays combined.
    String,
    /// One independent run per physical inverter unit.
    Micro,
    /// Pre-computed AC power, no physical modeling.
    Simple { ac_power: PowerSeries },
}

impl Topology {
    pub fn tag(&self) -> &'static str {
        match self {
            Topology::String => "string",
            Topology::Micro => "micro",
            Topology::Simple { .. } => "simple",
        }
    }
}

/// A PV installation as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSpec {
    /// Unique within a configuration.
    pub name: String,
    /// Id of the site whose location and weather sources this plant uses.
    pub site: String,
    pub topology: Topology,
    /// Overrides the site location for physical modeling only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub arrays: Vec<ArraySpec>,
}

impl PlantSpec {
    /// Number of physical-model invocations this plant needs.
    pub fn device_count(&self) -> u32 {
        match self.topology {
            Topology::String => 1,
            Topology::Micro => self.arrays.iter().map(|a| a.inverter.nr_inverters).sum(),
            Topology::Simple { .. } => 0,
        }
    }
}
