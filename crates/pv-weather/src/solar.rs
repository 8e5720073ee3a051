//! Solar geometry and clear-sky reference irradiance.
//!
//! Pipeline for one timestamp:
//!  1. Solar position: Spencer (1971) declination and equation of time,
//!     true solar time from UTC + longitude, elevation and azimuth.
//!  2. Extraterrestrial normal irradiance, eccentricity corrected.
//!  3. Relative air mass (Kasten & Young 1989), pressure corrected by altitude.
//!  4. Ineichen-Perez clear-sky GHI/DNI/DHI with a fixed Linke turbidity.

use chrono::{Datelike, Timelike};
use pv_core::{Location, Timestamp};
use std::f64::consts::PI;

/// Solar constant, W/m^2
pub const SOLAR_CONSTANT: f64 = 1361.0;

const DEG: f64 = PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Degrees from vertical
    pub zenith_deg: f64,
    /// Degrees above horizon
    pub elevation_deg: f64,
    /// Degrees clockwise from north
    pub azimuth_deg: f64,
}

impl SolarPosition {
    pub fn cos_zenith(&self) -> f64 {
        (self.zenith_deg * DEG).cos()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Irradiance {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

impl Irradiance {
    pub const ZERO: Irradiance = Irradiance {
        ghi: 0.0,
        dni: 0.0,
        dhi: 0.0,
    };
}

fn day_angle(ts: Timestamp) -> f64 {
    2.0 * PI * (ts.ordinal() as f64 - 1.0) / 365.0
}

fn utc_hours(ts: Timestamp) -> f64 {
    ts.hour() as f64 + ts.minute() as f64 / 60.0 + ts.second() as f64 / 3600.0
}

pub fn solar_position(ts: Timestamp, location: &Location) -> SolarPosition {
    let b = day_angle(ts);

    let decl = 0.006918 - 0.399912 * b.cos() + 0.070257 * b.sin()
        - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin();

    // Equation of time, minutes
    let eot_min = 229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    let solar_time_h = utc_hours(ts) + location.longitude / 15.0 + eot_min / 60.0;
    let omega = 15.0 * (solar_time_h - 12.0) * DEG;

    let lat = location.latitude * DEG;
    let sin_alpha = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let alpha = sin_alpha.asin();

    let cos_az = if alpha.cos().abs() > 1e-9 && lat.cos().abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / (alpha.cos() * lat.cos())
    } else {
        0.0
    };
    let az_abs = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    // Hour angle wraps; afternoon is a positive sine.
    let azimuth_deg = if omega.sin() > 0.0 { 360.0 - az_abs } else { az_abs };

    SolarPosition {
        zenith_deg: 90.0 - alpha / DEG,
        elevation_deg: alpha / DEG,
        azimuth_deg,
    }
}

/// Eccentricity-corrected extraterrestrial normal irradiance, W/m^2.
pub fn extraterrestrial_irradiance(ts: Timestamp) -> f64 {
    let b = day_angle(ts);
    SOLAR_CONSTANT
        * (1.00011 + 0.034221 * b.cos() + 0.00128 * b.sin() + 0.000719 * (2.0 * b).cos()
            + 0.000077 * (2.0 * b).sin())
}

/// Kasten & Young relative air mass; `None` with the sun below the horizon.
pub fn relative_airmass(zenith_deg: f64) -> Option<f64> {
    if zenith_deg >= 90.0 {
        return None;
    }
    let am = 1.0 / ((zenith_deg * DEG).cos() + 0.50572 * (96.07995 - zenith_deg).powf(-1.6364));
    Some(am.max(1.0))
}

/// Ineichen-Perez clear-sky model.
pub fn ineichen(position: &SolarPosition, altitude_m: f64, dni_extra: f64, linke: f64) -> Irradiance {
    let cos_z = position.cos_zenith();
    let Some(am_rel) = relative_airmass(position.zenith_deg) else {
        return Irradiance::ZERO;
    };
    if cos_z <= 0.0 {
        return Irradiance::ZERO;
    }
    let am = am_rel * (-0.0001184 * altitude_m).exp();

    let fh1 = (-altitude_m / 8000.0).exp();
    let fh2 = (-altitude_m / 1250.0).exp();
    let cg1 = 5.09e-5 * altitude_m + 0.868;
    let cg2 = 3.92e-5 * altitude_m + 0.0387;

    let ghi = (cg1 * dni_extra * cos_z * (-cg2 * am * (fh1 + fh2 * (linke - 1.0))).exp()).max(0.0);

    let b = 0.664 + 0.163 / fh1;
    let bnci = (dni_extra * b * (-0.09 * am * (linke - 1.0)).exp()).max(0.0);
    let bnci_2 = ghi * ((1.0 - (0.1 - 0.2 * (-linke).exp()) / (0.1 + 0.882 / fh1)) / cos_z).clamp(0.0, 1e20);
    let dni = bnci.min(bnci_2);
    let dhi = (ghi - dni * cos_z).max(0.0);

    Irradiance { ghi, dni, dhi }
}

/// Clear-sky irradiance for a timestamp and location.
pub fn clear_sky(ts: Timestamp, location: &Location, linke: f64) -> Irradiance {
    let position = solar_position(ts, location);
    ineichen(&position, location.altitude, extraterrestrial_irradiance(ts), linke)
}

/// Erbs (1982) split of global horizontal irradiance into direct normal and
/// diffuse horizontal components.
pub fn erbs(ghi: f64, position: &SolarPosition, dni_extra: f64) -> Irradiance {
    // Below ~86.3 degrees of zenith the beam term is unreliable.
    const MIN_COS_ZENITH: f64 = 0.065;
    let cos_z = position.cos_zenith();
    if ghi <= 0.0 {
        return Irradiance::ZERO;
    }
    if cos_z < MIN_COS_ZENITH {
        return Irradiance { ghi, dni: 0.0, dhi: ghi };
    }

    let kt = (ghi / (dni_extra * cos_z)).clamp(0.0, 1.0);
    let kd = if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.80 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    };

    let dhi = kd * ghi;
    let dni = ((ghi - dhi) / cos_z).max(0.0);
    Irradiance { ghi, dni, dhi }
}
