//! Reference physical model in the PVWatts family.
//!
//! Per timestamp:
//!  1. Sun position at the plant location.
//!  2. Plane-of-array irradiance: beam on the tilted surface, isotropic sky
//!     diffuse, ground reflection with a fixed albedo.
//!  3. Faiman cell temperature from air temperature and wind speed.
//!  4. DC power with the module temperature coefficient, less system losses.
//!  5. PVWatts inverter efficiency curve, clipped at the AC rating.

use pv_core::{ForecastEntry, Location, PowerSeries, WeatherRecord, WeatherSeries};
use pv_weather::solar::{self, SolarPosition};
use std::f64::consts::PI;

use crate::adapter::{ArrayInput, DeviceSpec, PhysicalModel};
use crate::error::{ModelExecutionError, ModelResult};
use crate::hardware::InverterSpec;

const DEG: f64 = PI / 180.0;
const STC_IRRADIANCE: f64 = 1000.0;
const STC_TEMPERATURE: f64 = 25.0;
/// Reference efficiency of the PVWatts inverter curve.
const ETA_REF: f64 = 0.9637;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvWattsModel {
    /// Ground reflectance
    pub albedo: f64,
    /// Fraction of DC lost to wiring, soiling and mismatch
    pub dc_losses: f64,
}

impl Default for PvWattsModel {
    fn default() -> Self {
        Self {
            albedo: 0.2,
            dc_losses: 0.14,
        }
    }
}

/// Irradiance on a tilted surface, W/m^2.
pub fn plane_of_array(
    position: &SolarPosition,
    tilt_deg: f64,
    azimuth_deg: f64,
    ghi: f64,
    dni: f64,
    dhi: f64,
    albedo: f64,
) -> f64 {
    let tilt = tilt_deg * DEG;
    let zenith = position.zenith_deg * DEG;
    let cos_aoi = zenith.cos() * tilt.cos()
        + zenith.sin() * tilt.sin() * ((position.azimuth_deg - azimuth_deg) * DEG).cos();

    let beam = if position.elevation_deg > 0.0 {
        dni * cos_aoi.max(0.0)
    } else {
        0.0
    };
    let sky = dhi * (1.0 + tilt.cos()) / 2.0;
    let ground = ghi * albedo * (1.0 - tilt.cos()) / 2.0;
    (beam + sky + ground).max(0.0)
}

/// Faiman (2008) module temperature, C.
pub fn faiman_cell_temperature(poa: f64, air_temperature: f64, wind_speed: f64, u0: f64, u1: f64) -> f64 {
    air_temperature + poa / (u0 + u1 * wind_speed.max(0.0))
}

/// PVWatts inverter: AC output for a DC input, clipped at `paco_w`.
pub fn inverter_ac(pdc: f64, inverter: &InverterSpec) -> f64 {
    if pdc <= 0.0 {
        return 0.0;
    }
    let pdc0 = inverter.paco_w / inverter.eta_nom;
    let zeta = pdc / pdc0;
    let eta = inverter.eta_nom / ETA_REF * (-0.0162 * zeta - 0.0059 / zeta + 0.9858);
    (eta * pdc).clamp(0.0, inverter.paco_w)
}

impl PvWattsModel {
    fn array_dc(&self, array: &ArrayInput, position: &SolarPosition, record: &WeatherRecord) -> ModelResult<f64> {
        let (Some(ghi), Some(dni), Some(dhi)) = (record.ghi, record.dni, record.dhi) else {
            return Err(ModelExecutionError::NonPhysical {
                what: format!("record at {} has no irradiance components", record.timestamp),
            });
        };
        let poa = plane_of_array(position, array.tilt, array.azimuth, ghi, dni, dhi, self.albedo);
        let t_cell = faiman_cell_temperature(
            poa,
            record.temperature,
            record.wind_speed,
            array.module.u0,
            array.module.u1,
        );
        let dc = array.pdc0_w() * poa / STC_IRRADIANCE
            * (1.0 + array.module.gamma_pdc * (t_cell - STC_TEMPERATURE));
        Ok(dc.max(0.0))
    }

    fn check_hardware(device: &DeviceSpec) -> ModelResult<()> {
        let inverter = &device.inverter;
        if !(inverter.paco_w > 0.0 && inverter.eta_nom > 0.0 && inverter.eta_nom <= 1.0) {
            return Err(ModelExecutionError::InvalidHardware {
                what: format!("inverter '{}' needs paco_w > 0 and eta_nom in (0, 1]", inverter.id),
            });
        }
        if let Some(array) = device.arrays.iter().find(|a| !(a.module.pdc0_w > 0.0)) {
            return Err(ModelExecutionError::InvalidHardware {
                what: format!("module '{}' needs pdc0_w > 0", array.module.id),
            });
        }
        Ok(())
    }
}

impl PhysicalModel for PvWattsModel {
    fn name(&self) -> &str {
        "pvwatts"
    }

    fn run(&self, location: &Location, device: &DeviceSpec, weather: &WeatherSeries) -> ModelResult<PowerSeries> {
        Self::check_hardware(device)?;

        let mut entries = Vec::with_capacity(weather.len());
        for record in weather.iter() {
            let position = solar::solar_position(record.timestamp, location);
            let mut dc = 0.0;
            for array in &device.arrays {
                dc += self.array_dc(array, &position, record)?;
            }
            let ac = inverter_ac(dc * (1.0 - self.dc_losses), &device.inverter);
            if !ac.is_finite() {
                return Err(ModelExecutionError::NonPhysical {
                    what: format!("AC power at {} is not finite", record.timestamp),
                });
            }
            entries.push(ForecastEntry::new(record.timestamp, Some(ac)));
        }

        PowerSeries::new(entries).map_err(|e| ModelExecutionError::Backend {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::ModuleSpec;
    use chrono::{TimeZone, Utc};
    use pv_core::DeviceId;

    fn device(modules: u32) -> DeviceSpec {
        DeviceSpec {
            id: DeviceId::new(0, 0),
            arrays: vec![ArrayInput {
                name: "roof".into(),
                tilt: 35.0,
                azimuth: 180.0,
                module: ModuleSpec {
                    id: "m400".into(),
                    pdc0_w: 400.0,
                    gamma_pdc: -0.004,
                    u0: 25.0,
                    u1: 6.84,
                },
                modules,
            }],
            inverter: InverterSpec {
                id: "inv".into(),
                paco_w: 3000.0,
                eta_nom: 0.96,
            },
        }
    }

    #[test]
    fn inverter_clips_at_rating() {
        let inv = InverterSpec {
            id: "i".into(),
            paco_w: 250.0,
            eta_nom: 0.96,
        };
        assert_eq!(inverter_ac(10_000.0, &inv), 250.0);
        assert_eq!(inverter_ac(0.0, &inv), 0.0);
        let part = inverter_ac(100.0, &inv);
        assert!(part > 90.0 && part < 100.0, "got {part}");
    }

    #[test]
    fn flat_panel_sees_global_irradiance() {
        let pos = SolarPosition {
            zenith_deg: 30.0,
            elevation_deg: 60.0,
            azimuth_deg: 180.0,
        };
        let ghi = 500.0 * (30.0 * DEG).cos() + 100.0;
        let poa = plane_of_array(&pos, 0.0, 180.0, ghi, 500.0, 100.0, 0.2);
        assert!((poa - ghi).abs() < 1e-9);
    }

    #[test]
    fn night_is_zero_and_noon_is_positive() {
        let loc = Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0);
        let noon = Utc.with_ymd_and_hms(2024, 6, 21, 11, 40, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 6, 21, 23, 0, 0).unwrap();
        let weather = WeatherSeries::new(vec![
            WeatherRecord::new(noon, 20.0, 2.0).with_irradiance(850.0, 800.0, 150.0),
            WeatherRecord::new(night, 12.0, 2.0).with_irradiance(0.0, 0.0, 0.0),
        ])
        .unwrap();
        let out = PvWattsModel::default().run(&loc, &device(8), &weather).unwrap();
        let noon_w = out.get(noon).flatten().unwrap();
        assert!(noon_w > 1500.0 && noon_w <= 3000.0, "got {noon_w}");
        assert_eq!(out.get(night), Some(Some(0.0)));
    }

    #[test]
    fn incomplete_weather_is_a_model_error() {
        let loc = Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0);
        let t = Utc.with_ymd_and_hms(2024, 6, 21, 11, 0, 0).unwrap();
        let weather = WeatherSeries::new(vec![WeatherRecord::new(t, 20.0, 2.0).with_cloud_cover(0.3)]).unwrap();
        let err = PvWattsModel::default().run(&loc, &device(1), &weather).unwrap_err();
        assert!(matches!(err, ModelExecutionError::NonPhysical { .. }));
    }

    #[test]
    fn zero_rated_inverter_is_invalid_hardware() {
        let loc = Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0);
        let mut dev = device(1);
        dev.inverter.paco_w = 0.0;
        let err = PvWattsModel::default()
            .run(&loc, &dev, &WeatherSeries::default())
            .unwrap_err();
        assert!(matches!(err, ModelExecutionError::InvalidHardware { .. }));
    }
}
