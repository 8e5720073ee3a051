//! Weather records read from a local JSON or YAML file.

use async_trait::async_trait;
use pv_core::{TimeRange, WeatherRecord, WeatherSeries};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RegistryError, SourceResult, SourceUnavailableError, UnavailableReason};
use crate::registry::SourceConfig;
use crate::source::WeatherSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// `.yaml`/`.yml` is YAML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                FileFormat::Yaml
            }
            _ => FileFormat::Json,
        }
    }
}

/// A list of [`WeatherRecord`]s on disk. The file is re-read on every retrieval.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    format: FileFormat,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self {
            name: name.into(),
            path,
            format,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, RegistryError> {
        let path = config.require_str("path")?;
        Ok(Self::new(config.name.clone(), path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, text: &str) -> SourceResult<Vec<WeatherRecord>> {
        match self.format {
            FileFormat::Json => {
                serde_json::from_str(text).map_err(|e| SourceUnavailableError::parse(&self.name, e))
            }
            FileFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| SourceUnavailableError::parse(&self.name, e))
            }
        }
    }
}

#[async_trait]
impl WeatherSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self, range: TimeRange) -> SourceResult<WeatherSeries> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceUnavailableError::io(&self.name, format!("{}: {e}", self.path.display())))?;

        let records: Vec<WeatherRecord> = self
            .parse(&text)?
            .into_iter()
            .filter(|r| range.contains(r.timestamp))
            .collect();
        debug!(source = %self.name, records = records.len(), "read weather file");

        if records.is_empty() {
            return Err(SourceUnavailableError::new(&self.name, UnavailableReason::Empty));
        }
        WeatherSeries::new(records).map_err(|e| SourceUnavailableError::parse(&self.name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(FileFormat::from_path(Path::new("w.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("w.YML")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("w.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("weather")), FileFormat::Json);
    }

    #[test]
    fn config_path_is_used() {
        let cfg = SourceConfig::new("local", "file").with_option("path", "data/w.yaml");
        let source = FileSource::from_config(&cfg).unwrap();
        assert_eq!(source.path(), Path::new("data/w.yaml"));
        assert_eq!(source.name(), "local");
    }
}
