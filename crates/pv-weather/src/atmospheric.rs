//! Completion of weather records into irradiance components and precipitable water.
//!
//! Whatever subset of fields a source provides, the converter produces records
//! carrying GHI, DNI, DHI and precipitable water:
//!
//! | supplied                    | derivation                                      |
//! |-----------------------------|-------------------------------------------------|
//! | ghi + dni + dhi             | passed through untouched                        |
//! | ghi (+ one of dni/dhi)      | Erbs split, or closure for the missing one      |
//! | dni + dhi                   | closure `ghi = dni * cos(z) + dhi`              |
//! | dni or dhi + cloud cover    | cover-scaled GHI, closure for the missing one   |
//! | cloud cover only            | clear-sky GHI scaled by cover, then Erbs split  |
//!
//! Precipitable water, when missing, follows Gueymard (1994).

use pv_core::{Location, WeatherRecord, WeatherSeries, finite, is_non_negative};
use tracing::debug;

use crate::error::DataIncompleteError;
use crate::solar::{self, Irradiance};

/// Output of a lenient conversion: the completed records plus the ones dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub series: WeatherSeries,
    pub dropped: Vec<DataIncompleteError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericConverter {
    /// Linke turbidity of the clear-sky reference
    pub linke_turbidity: f64,
    /// Fraction of clear-sky GHI left under full cloud cover, in (0, 1]
    pub cloud_floor: f64,
    /// Relative humidity (%) assumed when a record carries none
    pub reference_humidity: f64,
}

impl Default for AtmosphericConverter {
    fn default() -> Self {
        Self {
            linke_turbidity: 3.0,
            cloud_floor: 0.35,
            reference_humidity: 60.0,
        }
    }
}

impl AtmosphericConverter {
    /// Convert every record; fails on the first record that cannot be completed.
    pub fn convert(
        &self,
        series: &WeatherSeries,
        location: &Location,
    ) -> Result<WeatherSeries, DataIncompleteError> {
        let records = series
            .iter()
            .map(|r| self.convert_record(r, location))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rebuild(records))
    }

    /// Convert every record, dropping the ones that cannot be completed.
    pub fn convert_lenient(&self, series: &WeatherSeries, location: &Location) -> Conversion {
        let mut records = Vec::with_capacity(series.len());
        let mut dropped = Vec::new();
        for record in series.iter() {
            match self.convert_record(record, location) {
                Ok(r) => records.push(r),
                Err(e) => {
                    debug!(timestamp = %e.timestamp, field = e.field, "dropping weather record");
                    dropped.push(e);
                }
            }
        }
        Conversion {
            series: rebuild(records),
            dropped,
        }
    }

    pub fn convert_record(
        &self,
        record: &WeatherRecord,
        location: &Location,
    ) -> Result<WeatherRecord, DataIncompleteError> {
        let ts = record.timestamp;
        let missing = |field, reason| DataIncompleteError::new(ts, field, reason);

        if !record.temperature.is_finite() {
            return Err(missing("temperature", "not a finite number"));
        }
        if !is_non_negative(record.wind_speed) {
            return Err(missing("wind_speed", "must be finite and non-negative"));
        }
        for (field, value) in [("ghi", record.ghi), ("dni", record.dni), ("dhi", record.dhi)] {
            if let Some(v) = value
                && !is_non_negative(v)
            {
                return Err(missing(field, "irradiance must be finite and non-negative"));
            }
        }

        let mut out = record.clone();

        if !record.has_full_irradiance() {
            let irr = self.irradiance(record, location)?;
            out.ghi = Some(irr.ghi);
            out.dni = Some(irr.dni);
            out.dhi = Some(irr.dhi);
        }

        if record.precipitable_water.is_none() {
            let rh = match record.relative_humidity {
                Some(rh) if rh.is_finite() && (0.0..=100.0).contains(&rh) => rh,
                Some(_) => return Err(missing("relative_humidity", "must be within 0..=100 %")),
                None => self.reference_humidity,
            };
            out.precipitable_water = Some(precipitable_water(record.temperature, rh));
        } else if !finite(record.precipitable_water).is_some_and(is_non_negative) {
            return Err(missing("precipitable_water", "must be finite and non-negative"));
        }

        Ok(out)
    }

    fn irradiance(
        &self,
        record: &WeatherRecord,
        location: &Location,
    ) -> Result<Irradiance, DataIncompleteError> {
        let ts = record.timestamp;
        let position = solar::solar_position(ts, location);
        let cos_z = position.cos_zenith();
        let dni_extra = solar::extraterrestrial_irradiance(ts);

        match (record.ghi, record.dni, record.dhi) {
            (Some(ghi), None, None) => Ok(solar::erbs(ghi, &position, dni_extra)),
            (Some(ghi), Some(dni), None) => Ok(Irradiance {
                ghi,
                dni,
                dhi: (ghi - dni * cos_z.max(0.0)).max(0.0),
            }),
            (Some(ghi), None, Some(dhi)) => Ok(Irradiance {
                ghi,
                dni: if cos_z > 0.065 {
                    ((ghi - dhi) / cos_z).max(0.0)
                } else {
                    0.0
                },
                dhi,
            }),
            (None, Some(dni), Some(dhi)) => Ok(Irradiance {
                ghi: dni * cos_z.max(0.0) + dhi,
                dni,
                dhi,
            }),
            // A single measured component is kept; GHI comes from the cloud
            // mapping, raised where needed so the missing part stays >= 0.
            (None, Some(dni), None) => {
                let beam = dni * cos_z.max(0.0);
                let ghi = self.cloudy_ghi(record, &position, location, dni_extra)?.max(beam);
                Ok(Irradiance {
                    ghi,
                    dni,
                    dhi: (ghi - beam).max(0.0),
                })
            }
            (None, None, Some(dhi)) => {
                let ghi = self.cloudy_ghi(record, &position, location, dni_extra)?.max(dhi);
                let dni = if cos_z > 0.065 {
                    ((ghi - dhi) / cos_z).max(0.0)
                } else {
                    0.0
                };
                Ok(Irradiance {
                    ghi: dni * cos_z.max(0.0) + dhi,
                    dni,
                    dhi,
                })
            }
            _ => {
                let ghi = self.cloudy_ghi(record, &position, location, dni_extra)?;
                Ok(solar::erbs(ghi, &position, dni_extra))
            }
        }
    }

    /// Clear-sky GHI scaled by the record's cloud cover.
    fn cloudy_ghi(
        &self,
        record: &WeatherRecord,
        position: &solar::SolarPosition,
        location: &Location,
        dni_extra: f64,
    ) -> Result<f64, DataIncompleteError> {
        let ts = record.timestamp;
        let cover = record.cloud_cover.ok_or_else(|| {
            DataIncompleteError::new(ts, "irradiance", "neither global irradiance nor cloud cover supplied")
        })?;
        if !cover.is_finite() || !(0.0..=1.0).contains(&cover) {
            return Err(DataIncompleteError::new(ts, "cloud_cover", "must be a fraction within 0..=1"));
        }
        let clear = solar::ineichen(position, location.altitude, dni_extra, self.linke_turbidity);
        Ok(self.cloud_scaling(cover) * clear.ghi)
    }

    /// Share of clear-sky GHI reaching the ground at `cover`; 1 at clear sky,
    /// `cloud_floor` at full overcast, linear in between.
    pub fn cloud_scaling(&self, cover: f64) -> f64 {
        let cover = cover.clamp(0.0, 1.0);
        self.cloud_floor + (1.0 - self.cloud_floor) * (1.0 - cover)
    }
}

fn rebuild(records: Vec<WeatherRecord>) -> WeatherSeries {
    // Conversion never touches timestamps, so input order is preserved.
    WeatherSeries::from_unordered(records)
}

/// Gueymard (1994) precipitable water in cm from air temperature (C) and
/// relative humidity (%). Never below 0.1 cm.
pub fn precipitable_water(temperature_c: f64, relative_humidity: f64) -> f64 {
    let t = temperature_c + 273.15;
    let theta = t / 273.15;
    let pw = 0.1 * (0.4976 + 1.5265 * theta + (13.6897 * theta - 14.9188 * theta.powi(3)).exp());
    let vapor_density = 216.7 * relative_humidity / (100.0 * t)
        * (22.330 - 49.140 * (100.0 / t) - 10.922 * (100.0 / t).powi(2) - 0.39015 * t / 100.0).exp();
    (pw * vapor_density).max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pv_core::Timestamp;

    fn loc() -> Location {
        Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0)
    }

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 21, 11, 40, 0).unwrap()
    }

    #[test]
    fn measured_irradiance_is_never_overwritten() {
        let rec = WeatherRecord::new(noon(), 20.0, 2.0)
            .with_irradiance(123.0, 45.0, 67.0)
            .with_cloud_cover(1.0);
        let out = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap();
        assert_eq!((out.ghi, out.dni, out.dhi), (Some(123.0), Some(45.0), Some(67.0)));
        assert!(out.precipitable_water.is_some());
    }

    #[test]
    fn cloud_cover_only_is_completed() {
        let rec = WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(0.5);
        let out = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap();
        assert!(out.is_complete());
        assert!(out.ghi.unwrap() > 0.0);
    }

    #[test]
    fn full_overcast_keeps_a_floor() {
        let conv = AtmosphericConverter::default();
        let clear = conv
            .convert_record(&WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(0.0), &loc())
            .unwrap();
        let overcast = conv
            .convert_record(&WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(1.0), &loc())
            .unwrap();
        let ratio = overcast.ghi.unwrap() / clear.ghi.unwrap();
        assert!((ratio - 0.35).abs() < 1e-9, "ratio {ratio}");
    }

    #[test]
    fn diffuse_and_direct_close_to_global() {
        let mut rec = WeatherRecord::new(noon(), 20.0, 2.0);
        rec.dni = Some(600.0);
        rec.dhi = Some(100.0);
        let out = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap();
        let cos_z = solar::solar_position(noon(), &loc()).cos_zenith();
        assert!((out.ghi.unwrap() - (600.0 * cos_z + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn measured_direct_survives_cloud_cover() {
        let mut rec = WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(0.5);
        rec.dni = Some(123.0);
        let out = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap();
        assert_eq!(out.dni, Some(123.0));
        let cos_z = solar::solar_position(noon(), &loc()).cos_zenith();
        let closure = 123.0 * cos_z + out.dhi.unwrap();
        assert!((closure - out.ghi.unwrap()).abs() < 1e-9);
        assert!(out.dhi.unwrap() >= 0.0);
    }

    #[test]
    fn measured_diffuse_survives_cloud_cover() {
        let mut rec = WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(0.5);
        rec.dhi = Some(80.0);
        let out = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap();
        assert_eq!(out.dhi, Some(80.0));
        let cos_z = solar::solar_position(noon(), &loc()).cos_zenith();
        let closure = out.dni.unwrap() * cos_z + 80.0;
        assert!((closure - out.ghi.unwrap()).abs() < 1e-9);
        assert!(out.dni.unwrap() >= 0.0);
    }

    #[test]
    fn single_component_without_cloud_cover_is_incomplete() {
        let mut rec = WeatherRecord::new(noon(), 20.0, 2.0);
        rec.dni = Some(123.0);
        let err = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap_err();
        assert_eq!(err.field, "irradiance");
    }

    #[test]
    fn missing_everything_is_incomplete() {
        let rec = WeatherRecord::new(noon(), 20.0, 2.0);
        let err = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap_err();
        assert_eq!(err.field, "irradiance");
        assert_eq!(err.timestamp, noon());
    }

    #[test]
    fn cloud_cover_outside_unit_interval_is_rejected() {
        let rec = WeatherRecord::new(noon(), 20.0, 2.0).with_cloud_cover(75.0);
        let err = AtmosphericConverter::default().convert_record(&rec, &loc()).unwrap_err();
        assert_eq!(err.field, "cloud_cover");
    }

    #[test]
    fn strict_conversion_reports_first_offender() {
        let t0 = noon();
        let t1 = t0 + chrono::TimeDelta::hours(1);
        let t2 = t0 + chrono::TimeDelta::hours(2);
        let series = WeatherSeries::new(vec![
            WeatherRecord::new(t0, 20.0, 2.0).with_cloud_cover(0.2),
            WeatherRecord::new(t1, f64::NAN, 2.0).with_cloud_cover(0.2),
            WeatherRecord::new(t2, 20.0, 2.0),
        ])
        .unwrap();
        let conv = AtmosphericConverter::default();
        let err = conv.convert(&series, &loc()).unwrap_err();
        assert_eq!(err.timestamp, t1);

        let lenient = conv.convert_lenient(&series, &loc());
        assert_eq!(lenient.series.timestamps(), vec![t0]);
        assert_eq!(lenient.dropped.len(), 2);
    }

    #[test]
    fn precipitable_water_grows_with_temperature() {
        let cold = precipitable_water(0.0, 60.0);
        let warm = precipitable_water(25.0, 60.0);
        assert!(warm > cold);
        assert!(cold >= 0.1);
        assert_eq!(precipitable_water(-40.0, 0.0), 0.1);
    }
}
