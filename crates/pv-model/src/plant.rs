//! Plant model: topology dispatch, per-device fan-out and failure containment.
//!
//! | topology | model runs                    | on model failure                        |
//! |----------|-------------------------------|-----------------------------------------|
//! | simple   | none                          | n/a, supplied series returned unchanged |
//! | string   | one across all arrays         | whole plant zero-filled, degraded       |
//! | micro    | one per physical inverter     | only that inverter zero-filled          |
//!
//! Hardware is resolved in [`PlantModel::build`], before any run is possible.

use pv_core::{DeviceId, ForecastEntry, Location, PlantSpec, PowerSeries, Timestamp, Topology, WeatherSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapter::{ArrayInput, DeviceSpec, PhysicalModel};
use crate::error::{ConfigurationError, ModelExecutionError};
use crate::hardware::HardwareDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Ok,
    /// Ran, but some or all output was zero-filled after a model failure.
    Degraded,
    /// Not run at all.
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Ok => "ok",
            ExecutionStatus::Degraded => "degraded",
            ExecutionStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceOutcome {
    pub id: DeviceId,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Timestamps zero-filled for this device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zero_filled: Vec<Timestamp>,
}

/// Result of one plant run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantRun {
    pub series: PowerSeries,
    pub status: ExecutionStatus,
    pub reason: Option<String>,
    pub devices: Vec<DeviceOutcome>,
}

#[derive(Debug, Clone)]
enum Plan {
    Simple(PowerSeries),
    String(DeviceSpec),
    Micro(Vec<DeviceSpec>),
}

/// A plant definition resolved against the hardware database, ready to run.
#[derive(Debug, Clone)]
pub struct PlantModel {
    name: String,
    site: String,
    location: Arc<Location>,
    plan: Plan,
}

fn check_array_geometry(plant: &str, spec: &pv_core::ArraySpec) -> Result<(), ConfigurationError> {
    if !(0.0..=90.0).contains(&spec.tilt) {
        return Err(ConfigurationError::malformed(
            plant,
            format!("array '{}' tilt {} outside 0..=90", spec.name, spec.tilt),
        ));
    }
    if !(0.0..=360.0).contains(&spec.azimuth) {
        return Err(ConfigurationError::malformed(
            plant,
            format!("array '{}' azimuth {} outside 0..=360", spec.name, spec.azimuth),
        ));
    }
    if spec.modules_per_string == 0 || spec.strings == 0 || spec.inverter.nr_inverters == 0 {
        return Err(ConfigurationError::malformed(
            plant,
            format!("array '{}' has a zero module, string or inverter count", spec.name),
        ));
    }
    Ok(())
}

fn to_index(plant: &str, value: usize, what: &str) -> Result<u16, ConfigurationError> {
    u16::try_from(value).map_err(|_| ConfigurationError::malformed(plant, format!("too many {what}")))
}

impl PlantModel {
    /// Resolve hardware and fix the device layout of `spec`.
    ///
    /// `site_location` is used unless the plant carries its own location.
    pub fn build(
        spec: &PlantSpec,
        site_location: Arc<Location>,
        db: &dyn HardwareDatabase,
    ) -> Result<Self, ConfigurationError> {
        let plant = spec.name.as_str();
        let location = match &spec.location {
            Some(own) => Arc::new(own.clone()),
            None => site_location,
        };

        let plan = match &spec.topology {
            Topology::Simple { ac_power } => Plan::Simple(ac_power.clone()),
            Topology::String | Topology::Micro if spec.arrays.is_empty() => {
                return Err(ConfigurationError::malformed(
                    plant,
                    format!("{} topology needs at least one array", spec.topology.tag()),
                ));
            }
            Topology::String => {
                let first = &spec.arrays[0].inverter;
                if let Some(other) = spec
                    .arrays
                    .iter()
                    .find(|a| a.inverter.model != first.model || a.inverter.nr_inverters != 1)
                {
                    return Err(ConfigurationError::malformed(
                        plant,
                        format!(
                            "string topology needs one inverter model with nr_inverters = 1; array '{}' differs",
                            other.name
                        ),
                    ));
                }
                let inverter = db
                    .inverter(&first.model)
                    .map_err(|e| ConfigurationError::unknown_hardware(plant, e))?;
                let mut arrays = Vec::with_capacity(spec.arrays.len());
                for a in &spec.arrays {
                    check_array_geometry(plant, a)?;
                    let module = db
                        .module(&a.module)
                        .map_err(|e| ConfigurationError::unknown_hardware(plant, e))?;
                    arrays.push(ArrayInput {
                        name: a.name.clone(),
                        tilt: a.tilt,
                        azimuth: a.azimuth,
                        module,
                        modules: a.modules_per_string.saturating_mul(a.strings),
                    });
                }
                Plan::String(DeviceSpec {
                    id: DeviceId::STRING,
                    arrays,
                    inverter,
                })
            }
            Topology::Micro => {
                let mut devices = Vec::new();
                for (ai, a) in spec.arrays.iter().enumerate() {
                    check_array_geometry(plant, a)?;
                    let module = db
                        .module(&a.module)
                        .map_err(|e| ConfigurationError::unknown_hardware(plant, e))?;
                    let inverter = db
                        .inverter(&a.inverter.model)
                        .map_err(|e| ConfigurationError::unknown_hardware(plant, e))?;
                    let array_idx = to_index(plant, ai, "arrays")?;
                    for unit in 0..a.inverter.nr_inverters as usize {
                        devices.push(DeviceSpec {
                            id: DeviceId::new(array_idx, to_index(plant, unit, "inverters")?),
                            arrays: vec![ArrayInput {
                                name: a.name.clone(),
                                tilt: a.tilt,
                                azimuth: a.azimuth,
                                module: module.clone(),
                                modules: a.modules_per_string,
                            }],
                            inverter: inverter.clone(),
                        });
                    }
                }
                Plan::Micro(devices)
            }
        };

        debug!(plant, topology = spec.topology.tag(), "plant model built");
        Ok(Self {
            name: spec.name.clone(),
            site: spec.site.clone(),
            location,
            plan,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn location(&self) -> &Arc<Location> {
        &self.location
    }

    pub fn topology(&self) -> &'static str {
        match self.plan {
            Plan::Simple(_) => "simple",
            Plan::String(_) => "string",
            Plan::Micro(_) => "micro",
        }
    }

    /// Devices this plant runs, in execution order.
    pub fn devices(&self) -> &[DeviceSpec] {
        match &self.plan {
            Plan::Simple(_) => &[],
            Plan::String(d) => std::slice::from_ref(d),
            Plan::Micro(ds) => ds,
        }
    }

    pub fn needs_weather(&self) -> bool {
        !matches!(self.plan, Plan::Simple(_))
    }

    pub fn run(&self, model: &dyn PhysicalModel, weather: &WeatherSeries) -> PlantRun {
        // Never stopped, so always Some.
        self.run_until(model, weather, &|| false)
            .unwrap_or_else(|| self.skipped("interrupted"))
    }

    /// Like [`run`](Self::run), but gives up before each model invocation once
    /// `stop` returns true. Returns `None` when stopped.
    pub fn run_until(
        &self,
        model: &dyn PhysicalModel,
        weather: &WeatherSeries,
        stop: &(dyn Fn() -> bool + Sync),
    ) -> Option<PlantRun> {
        match &self.plan {
            Plan::Simple(series) => Some(PlantRun {
                series: series.clone(),
                status: ExecutionStatus::Ok,
                reason: None,
                devices: Vec::new(),
            }),
            Plan::String(device) => {
                if stop() {
                    return None;
                }
                let (values, outcome) = self.run_device(model, device, weather);
                let (status, reason) = (outcome.status, outcome.reason.clone());
                Some(PlantRun {
                    series: assemble(weather, values),
                    status,
                    reason,
                    devices: vec![outcome],
                })
            }
            Plan::Micro(devices) => {
                let results: Vec<Option<(Vec<f64>, DeviceOutcome)>> = devices
                    .par_iter()
                    .map(|d| (!stop()).then(|| self.run_device(model, d, weather)))
                    .collect();

                let mut totals = vec![0.0; weather.len()];
                let mut outcomes = Vec::with_capacity(devices.len());
                for result in results {
                    let (values, outcome) = result?;
                    for (total, v) in totals.iter_mut().zip(values) {
                        *total += v;
                    }
                    outcomes.push(outcome);
                }

                let degraded = outcomes
                    .iter()
                    .filter(|o| o.status != ExecutionStatus::Ok)
                    .count();
                let (status, reason) = if degraded == 0 {
                    (ExecutionStatus::Ok, None)
                } else {
                    (
                        ExecutionStatus::Degraded,
                        Some(format!("{degraded} of {} inverters degraded", outcomes.len())),
                    )
                };
                Some(PlantRun {
                    series: assemble(weather, totals),
                    status,
                    reason,
                    devices: outcomes,
                })
            }
        }
    }

    /// Report for a plant that was not run; every device is `Skipped` too.
    pub fn skipped(&self, reason: &str) -> PlantRun {
        PlantRun {
            series: PowerSeries::default(),
            status: ExecutionStatus::Skipped,
            reason: Some(reason.to_string()),
            devices: self
                .devices()
                .iter()
                .map(|d| DeviceOutcome {
                    id: d.id,
                    status: ExecutionStatus::Skipped,
                    reason: Some(reason.to_string()),
                    zero_filled: Vec::new(),
                })
                .collect(),
        }
    }

    /// One model invocation, aligned to the weather index and zero-filled where
    /// it produced nothing.
    fn run_device(
        &self,
        model: &dyn PhysicalModel,
        device: &DeviceSpec,
        weather: &WeatherSeries,
    ) -> (Vec<f64>, DeviceOutcome) {
        let index = weather.timestamps();
        match model
            .run(&self.location, device, weather)
            .and_then(|series| align(&index, &series))
        {
            Ok(values) => {
                let zero_filled: Vec<Timestamp> = index
                    .iter()
                    .zip(&values)
                    .filter(|(_, v)| v.is_none())
                    .map(|(t, _)| *t)
                    .collect();
                let values: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(0.0)).collect();
                let outcome = if zero_filled.is_empty() {
                    DeviceOutcome {
                        id: device.id,
                        status: ExecutionStatus::Ok,
                        reason: None,
                        zero_filled,
                    }
                } else {
                    warn!(plant = %self.name, device = %device.id, missing = zero_filled.len(), "model left gaps, zero-filled");
                    DeviceOutcome {
                        id: device.id,
                        status: ExecutionStatus::Degraded,
                        reason: Some(format!("no model value at {} timestamps", zero_filled.len())),
                        zero_filled,
                    }
                };
                (values, outcome)
            }
            Err(e) => {
                warn!(plant = %self.name, device = %device.id, error = %e, "model run failed, zero-filled");
                (
                    vec![0.0; index.len()],
                    DeviceOutcome {
                        id: device.id,
                        status: ExecutionStatus::Degraded,
                        reason: Some(e.to_string()),
                        zero_filled: index,
                    },
                )
            }
        }
    }
}

/// Values of `series` on `index`; fails unless both carry the same timestamps
/// and every present value is finite.
fn align(index: &[Timestamp], series: &PowerSeries) -> Result<Vec<Option<f64>>, ModelExecutionError> {
    let misaligned = || ModelExecutionError::MisalignedOutput {
        expected: index.len(),
        got: series.len(),
    };
    if series.len() != index.len() {
        return Err(misaligned());
    }
    let mut out = Vec::with_capacity(index.len());
    for (t, e) in index.iter().zip(series.iter()) {
        if e.timestamp != *t {
            return Err(misaligned());
        }
        if let Some(v) = e.ac_power_w
            && !v.is_finite()
        {
            return Err(ModelExecutionError::NonPhysical {
                what: format!("AC power at {t} is not finite"),
            });
        }
        out.push(e.ac_power_w);
    }
    Ok(out)
}

fn assemble(weather: &WeatherSeries, values: Vec<f64>) -> PowerSeries {
    let entries = weather
        .iter()
        .zip(values)
        .map(|(r, v)| ForecastEntry::new(r.timestamp, Some(v)))
        .collect();
    // Weather timestamps are strictly increasing already.
    PowerSeries::new(entries).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HardwareKind, ModelResult};
    use crate::hardware::{HardwareCatalog, InverterSpec, ModuleSpec};
    use chrono::{TimeDelta, TimeZone, Utc};
    use pv_core::{ArraySpec, InverterRef, WeatherRecord};

    struct Constant(f64);

    impl PhysicalModel for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn run(&self, _: &Location, d: &DeviceSpec, w: &WeatherSeries) -> ModelResult<PowerSeries> {
            let scale = f64::from(d.id.unit) + 1.0;
            PowerSeries::from_values(w.iter().map(|r| (r.timestamp, self.0 * scale)))
                .map_err(|e| ModelExecutionError::Backend { message: e.to_string() })
        }
    }

    fn catalog() -> HardwareCatalog {
        HardwareCatalog::default()
            .with_module(ModuleSpec {
                id: "m".into(),
                pdc0_w: 400.0,
                gamma_pdc: -0.004,
                u0: 25.0,
                u1: 6.84,
            })
            .with_inverter(InverterSpec {
                id: "inv".into(),
                paco_w: 300.0,
                eta_nom: 0.96,
            })
    }

    fn array(inverters: u32) -> ArraySpec {
        ArraySpec {
            name: "a".into(),
            tilt: 30.0,
            azimuth: 180.0,
            module: "m".into(),
            modules_per_string: 1,
            strings: 1,
            inverter: InverterRef::new("inv", inverters),
        }
    }

    fn plant(topology: Topology, arrays: Vec<ArraySpec>) -> PlantSpec {
        PlantSpec {
            name: "p".into(),
            site: "home".into(),
            topology,
            location: None,
            arrays,
        }
    }

    fn site() -> Arc<Location> {
        Arc::new(Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0))
    }

    fn weather(n: i64) -> WeatherSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        WeatherSeries::new(
            (0..n)
                .map(|h| WeatherRecord::new(t0 + TimeDelta::hours(h), 15.0, 1.0).with_irradiance(0.0, 0.0, 0.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn micro_device_ids_follow_arrays_and_units() {
        let model = PlantModel::build(&plant(Topology::Micro, vec![array(2), array(1)]), site(), &catalog()).unwrap();
        let ids: Vec<DeviceId> = model.devices().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DeviceId::new(0, 0), DeviceId::new(0, 1), DeviceId::new(1, 0)]);
    }

    #[test]
    fn unknown_module_fails_before_running() {
        let mut a = array(1);
        a.module = "ghost".into();
        let err = PlantModel::build(&plant(Topology::String, vec![a]), site(), &catalog()).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownHardware {
                plant: "p".into(),
                identifier: "ghost".into(),
                kind: HardwareKind::Module,
            }
        );
    }

    #[test]
    fn string_plant_rejects_multiple_inverter_units() {
        let err = PlantModel::build(&plant(Topology::String, vec![array(2)]), site(), &catalog()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedPlant { .. }));
    }

    #[test]
    fn micro_plant_without_arrays_is_malformed() {
        let err = PlantModel::build(&plant(Topology::Micro, vec![]), site(), &catalog()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedPlant { .. }));
    }

    #[test]
    fn plant_location_overrides_site() {
        let mut spec = plant(Topology::String, vec![array(1)]);
        spec.location = Some(Location::new(48.0, 11.0, "Europe/Berlin", 500.0));
        let model = PlantModel::build(&spec, site(), &catalog()).unwrap();
        assert_eq!(model.location().latitude, 48.0);
    }

    #[test]
    fn micro_sums_devices() {
        let model = PlantModel::build(&plant(Topology::Micro, vec![array(3)]), site(), &catalog()).unwrap();
        let run = model.run(&Constant(10.0), &weather(4));
        assert_eq!(run.status, ExecutionStatus::Ok);
        assert!(run.series.iter().all(|e| e.ac_power_w == Some(60.0)));
        assert_eq!(run.devices.len(), 3);
    }

    #[test]
    fn stop_before_run_yields_nothing() {
        let model = PlantModel::build(&plant(Topology::Micro, vec![array(3)]), site(), &catalog()).unwrap();
        assert!(model.run_until(&Constant(1.0), &weather(2), &|| true).is_none());
    }

    #[test]
    fn skipped_marks_every_device() {
        let model = PlantModel::build(&plant(Topology::Micro, vec![array(2)]), site(), &catalog()).unwrap();
        let run = model.skipped("no weather");
        assert_eq!(run.status, ExecutionStatus::Skipped);
        assert!(run.series.is_empty());
        assert!(run.devices.iter().all(|d| d.status == ExecutionStatus::Skipped));
    }
}
