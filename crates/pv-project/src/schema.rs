//! Project schema definitions.

use pv_core::{Location, PlantSpec};
use pv_model::HardwareCatalog;
use pv_weather::SourceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for `weather.timeout_s`: one day.
pub const MAX_TIMEOUT_S: f64 = 86_400.0;

fn default_timeout_s() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub sites: Vec<SiteDef>,
    #[serde(default)]
    pub hardware: HardwareCatalog,
    #[serde(default)]
    pub plants: Vec<PlantSpec>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::LATEST_VERSION,
            name: name.into(),
            sites: Vec::new(),
            hardware: HardwareCatalog::default(),
            plants: Vec::new(),
        }
    }

    pub fn site(&self, id: &str) -> Option<&SiteDef> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn plant(&self, name: &str) -> Option<&PlantSpec> {
        self.plants.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteDef {
    pub id: String,
    pub location: Location,
    #[serde(default)]
    pub weather: WeatherDef,
}

/// Weather sources of a site, most preferred first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherDef {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Per-source retrieval timeout, seconds
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
}

impl Default for WeatherDef {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            timeout_s: default_timeout_s(),
        }
    }
}

impl WeatherDef {
    /// `None` unless `timeout_s` lies in `(0, MAX_TIMEOUT_S]`.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_s > 0.0 && self.timeout_s <= MAX_TIMEOUT_S {
            Duration::try_from_secs_f64(self.timeout_s).ok()
        } else {
            None
        }
    }
}
