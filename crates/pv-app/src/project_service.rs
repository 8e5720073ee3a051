//! Project loading, validation and introspection.

use pv_project::Project;
use pv_weather::SourceRegistry;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::run_service;

/// Summary of a plant for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantSummary {
    pub name: String,
    pub site: String,
    pub topology: &'static str,
    pub array_count: usize,
    /// Physical model runs per forecast
    pub device_count: u32,
}

/// Load and schema-validate a project (YAML, or JSON by extension).
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(pv_project::load(path)?)
}

pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    Ok(pv_project::save(path, project)?)
}

/// Everything short of running: schema rules, source types known to
/// `registry`, and hardware resolution of every plant.
pub fn validate_project(project: &Project, project_dir: &Path, registry: &SourceRegistry) -> AppResult<()> {
    pv_project::validate_project(project)?;
    let orchestrator = run_service::build_orchestrator(project, project_dir, registry)?;
    orchestrator.prepare()?;
    Ok(())
}

pub fn list_plants(project: &Project) -> Vec<PlantSummary> {
    project
        .plants
        .iter()
        .map(|plant| PlantSummary {
            name: plant.name.clone(),
            site: plant.site.clone(),
            topology: plant.topology.tag(),
            array_count: plant.arrays.len(),
            device_count: plant.device_count(),
        })
        .collect()
}
