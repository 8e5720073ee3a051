//! Physical model capability interface.

use pv_core::{DeviceId, Location, PowerSeries, WeatherSeries};

use crate::error::ModelResult;
use crate::hardware::{InverterSpec, ModuleSpec};

/// One oriented group of identical modules feeding a device.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInput {
    pub name: String,
    /// Degrees from horizontal
    pub tilt: f64,
    /// Degrees clockwise from north
    pub azimuth: f64,
    pub module: ModuleSpec,
    /// Modules of this array behind the device's inverter
    pub modules: u32,
}

impl ArrayInput {
    /// Combined DC rating at STC, W.
    pub fn pdc0_w(&self) -> f64 {
        self.module.pdc0_w * f64::from(self.modules)
    }
}

/// Resolved hardware for one physical model run: one inverter unit and the
/// arrays behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub arrays: Vec<ArrayInput>,
    pub inverter: InverterSpec,
}

/// Pluggable physical model: weather in, AC power out.
///
/// The returned series must be indexed exactly like `weather`. A `None` entry
/// marks a timestamp the model could not evaluate.
pub trait PhysicalModel: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        location: &Location,
        device: &DeviceSpec,
        weather: &WeatherSeries,
    ) -> ModelResult<PowerSeries>;
}
