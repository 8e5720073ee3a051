//! Synthetic cloudless weather. Useful as a last-resort source and for
//! clear-sky reference forecasts.

use async_trait::async_trait;
use chrono::TimeDelta;
use pv_core::{TimeRange, WeatherRecord, WeatherSeries};

use crate::error::{RegistryError, SourceResult, SourceUnavailableError, UnavailableReason};
use crate::registry::SourceConfig;
use crate::source::WeatherSource;

#[derive(Debug, Clone)]
pub struct ClearSkySource {
    name: String,
    interval: TimeDelta,
    /// Air temperature, C
    temperature: f64,
    /// Wind speed, m/s
    wind_speed: f64,
}

impl ClearSkySource {
    pub fn new(name: impl Into<String>, interval: TimeDelta) -> Self {
        Self {
            name: name.into(),
            interval,
            temperature: 20.0,
            wind_speed: 1.0,
        }
    }

    pub fn with_conditions(mut self, temperature: f64, wind_speed: f64) -> Self {
        self.temperature = temperature;
        self.wind_speed = wind_speed;
        self
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, RegistryError> {
        let minutes = config.option_f64("interval_minutes")?.unwrap_or(60.0);
        if minutes < 1.0 || minutes.fract() != 0.0 {
            return Err(RegistryError::InvalidOption {
                source_name: config.name.clone(),
                option: "interval_minutes".into(),
                reason: "must be a whole number of minutes, at least 1".into(),
            });
        }
        let wind_speed = config.option_f64("wind_speed")?.unwrap_or(1.0);
        if wind_speed < 0.0 {
            return Err(RegistryError::InvalidOption {
                source_name: config.name.clone(),
                option: "wind_speed".into(),
                reason: "must be non-negative".into(),
            });
        }
        Ok(Self::new(config.name.clone(), TimeDelta::minutes(minutes as i64))
            .with_conditions(config.option_f64("temperature")?.unwrap_or(20.0), wind_speed))
    }
}

#[async_trait]
impl WeatherSource for ClearSkySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self, range: TimeRange) -> SourceResult<WeatherSeries> {
        let steps = range
            .steps(self.interval)
            .map_err(|e| SourceUnavailableError::parse(&self.name, e))?;
        if steps.is_empty() {
            return Err(SourceUnavailableError::new(&self.name, UnavailableReason::Empty));
        }
        let records = steps
            .into_iter()
            .map(|t| WeatherRecord::new(t, self.temperature, self.wind_speed).with_cloud_cover(0.0))
            .collect();
        WeatherSeries::new(records).map_err(|e| SourceUnavailableError::parse(&self.name, e))
    }
}
