//! Forecast composition and execution.

use pv_core::TimeRange;
use pv_forecast::{ForecastOrchestrator, ForecastReport, Site};
use pv_model::PvWattsModel;
use pv_project::Project;
use pv_weather::{SourceConfig, SourceRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::project_service;

/// Request to execute a forecast.
pub struct ForecastRequest<'a> {
    pub project_path: &'a Path,
    pub range: TimeRange,
}

#[derive(Debug, Clone)]
pub struct ForecastResponse {
    pub report: ForecastReport,
    pub elapsed_s: f64,
}

/// Relative `path` options of file sources are taken relative to the project file.
fn resolve_paths(config: &SourceConfig, project_dir: &Path) -> SourceConfig {
    let mut config = config.clone();
    let joined = config
        .options
        .get("path")
        .and_then(|p| p.as_str())
        .filter(|p| Path::new(p).is_relative())
        .map(|p| project_dir.join(p).to_string_lossy().into_owned());
    if let Some(joined) = joined {
        config.options.insert("path".to_string(), joined.into());
    }
    config
}

/// Sites with their sources built through `registry`.
pub fn build_sites(project: &Project, project_dir: &Path, registry: &SourceRegistry) -> AppResult<Vec<Site>> {
    let mut sites = Vec::with_capacity(project.sites.len());
    for def in &project.sites {
        let timeout = def.weather.timeout().ok_or_else(|| {
            AppError::InvalidInput(format!(
                "site '{}': weather.timeout_s = {} is out of range",
                def.id, def.weather.timeout_s
            ))
        })?;
        let mut site = Site::new(def.id.clone(), def.location.clone()).with_timeout(timeout);
        for config in &def.weather.sources {
            let source = registry.build(&resolve_paths(config, project_dir), &def.location)?;
            site = site.with_source(source);
        }
        sites.push(site);
    }
    Ok(sites)
}

pub fn build_orchestrator(
    project: &Project,
    project_dir: &Path,
    registry: &SourceRegistry,
) -> AppResult<ForecastOrchestrator> {
    let sites = build_sites(project, project_dir, registry)?;
    Ok(ForecastOrchestrator::new(
        sites,
        project.plants.clone(),
        Arc::new(project.hardware.clone()),
        Arc::new(PvWattsModel::default()),
    ))
}

fn project_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

pub async fn run_forecast(request: &ForecastRequest<'_>) -> AppResult<ForecastResponse> {
    let started = Instant::now();
    let project = project_service::load_project(request.project_path)?;
    let registry = SourceRegistry::with_builtin();
    let orchestrator = build_orchestrator(&project, project_dir(request.project_path), &registry)?;

    let report = orchestrator.run(request.range).await?;
    let elapsed_s = started.elapsed().as_secs_f64();
    info!(run_id = %report.run_id, elapsed_s, "forecast complete");

    Ok(ForecastResponse { report, elapsed_s })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_file_paths_follow_project() {
        let cfg = SourceConfig::new("f", "file").with_option("path", "weather/day.yaml");
        let resolved = resolve_paths(&cfg, Path::new("/srv/pv"));
        let expected = Path::new("/srv/pv").join("weather/day.yaml");
        assert_eq!(resolved.option_str("path").unwrap(), expected.to_str());
    }

    #[test]
    fn out_of_range_timeout_is_an_error_not_a_panic() {
        let mut project = Project::new("t");
        project.sites.push(pv_project::SiteDef {
            id: "home".into(),
            location: pv_core::Location::new(52.35, 4.88, "Europe/Amsterdam", 0.0),
            weather: pv_project::WeatherDef {
                sources: Vec::new(),
                timeout_s: 1.0e30,
            },
        });
        let err = build_sites(&project, Path::new("."), &SourceRegistry::with_builtin()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.contains("timeout_s")));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let cfg = SourceConfig::new("f", "file").with_option("path", "/data/w.json");
        let resolved = resolve_paths(&cfg, Path::new("/srv/pv"));
        assert_eq!(resolved.option_str("path").unwrap(), Some("/data/w.json"));
    }
}
