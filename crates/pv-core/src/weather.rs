//! Normalized weather observations.

use serde::{Deserialize, Serialize};

use crate::{PvError, PvResult, Timestamp};

/// One weather observation or forecast step.
///
/// Units: temperature in degrees Celsius, wind speed in m/s, cloud cover as a
/// fraction in [0, 1], irradiance in W/m^2, precipitable water in cm,
/// relative humidity in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: Timestamp,
    pub temperature: f64,
    pub wind_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dni: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitable_water: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_humidity: Option<f64>,
}

impl WeatherRecord {
    /// Record with only the mandatory fields set.
    pub fn new(timestamp: Timestamp, temperature: f64, wind_speed: f64) -> Self {
        Self {
            timestamp,
            temperature,
            wind_speed,
            cloud_cover: None,
            ghi: None,
            dni: None,
            dhi: None,
            precipitable_water: None,
            relative_humidity: None,
        }
    }

    pub fn with_cloud_cover(mut self, cover: f64) -> Self {
        self.cloud_cover = Some(cover);
        self
    }

    pub fn with_irradiance(mut self, ghi: f64, dni: f64, dhi: f64) -> Self {
        self.ghi = Some(ghi);
        self.dni = Some(dni);
        self.dhi = Some(dhi);
        self
    }

    pub fn has_full_irradiance(&self) -> bool {
        self.ghi.is_some() && self.dni.is_some() && self.dhi.is_some()
    }

    /// All three irradiance components and precipitable water are present.
    pub fn is_complete(&self) -> bool {
        self.has_full_irradiance() && self.precipitable_water.is_some()
    }
}

/// Ordered weather records: strictly increasing UTC timestamps, no duplicates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<WeatherRecord>", into = "Vec<WeatherRecord>")]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
}

impl WeatherSeries {
    pub fn new(records: Vec<WeatherRecord>) -> PvResult<Self> {
        for pair in records.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(PvError::UnorderedTimestamps {
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }
        Ok(Self { records })
    }

    /// Sort by timestamp and drop later duplicates before building the series.
    pub fn from_unordered(mut records: Vec<WeatherRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        records.dedup_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.records.iter()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    pub fn into_records(self) -> Vec<WeatherRecord> {
        self.records
    }
}

impl TryFrom<Vec<WeatherRecord>> for WeatherSeries {
    type Error = PvError;

    fn try_from(records: Vec<WeatherRecord>) -> Result<Self, Self::Error> {
        Self::new(records)
    }
}

impl From<WeatherSeries> for Vec<WeatherRecord> {
    fn from(series: WeatherSeries) -> Self {
        series.records
    }
}
