//! Explicit source registry: maps a source type tag to a constructor.
//!
//! The registry is built once by the composition layer at startup. The
//! orchestrator only ever sees the resulting `Arc<dyn WeatherSource>` values.

use pv_core::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::source::WeatherSource;
use crate::sources::{ClearSkySource, FileSource};

/// Configuration of one weather source as found in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    fn invalid(&self, option: &str, reason: &str) -> RegistryError {
        RegistryError::InvalidOption {
            source_name: self.name.clone(),
            option: option.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn option_f64(&self, key: &str) -> Result<Option<f64>, RegistryError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .filter(|x| x.is_finite())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a number")),
        }
    }

    pub fn option_str(&self, key: &str) -> Result<Option<&str>, RegistryError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a string")),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str, RegistryError> {
        self.option_str(key)?
            .ok_or_else(|| self.invalid(key, "required option is missing"))
    }
}

pub type SourceFactory = Box<
    dyn Fn(&SourceConfig, &Location) -> Result<Arc<dyn WeatherSource>, RegistryError> + Send + Sync,
>;

#[derive(Default)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `file` and `clearsky` source types.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("file", |cfg, _loc| {
            Ok(Arc::new(FileSource::from_config(cfg)?) as Arc<dyn WeatherSource>)
        });
        registry.register("clearsky", |cfg, _loc| {
            Ok(Arc::new(ClearSkySource::from_config(cfg)?) as Arc<dyn WeatherSource>)
        });
        registry
    }

    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&SourceConfig, &Location) -> Result<Arc<dyn WeatherSource>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.to_string(), Box::new(factory));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn build(
        &self,
        config: &SourceConfig,
        location: &Location,
    ) -> Result<Arc<dyn WeatherSource>, RegistryError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| RegistryError::UnknownType {
                kind: config.kind.clone(),
            })?;
        factory(config, location)
    }
}
