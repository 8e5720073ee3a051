//! Shared application service layer for pvcast.
//!
//! Loads and validates projects, composes weather sources through the
//! registry, runs forecasts and exports their reports.

pub mod error;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use project_service::{PlantSummary, list_plants, load_project, save_project, validate_project};
pub use query::{ReportSummary, get_report_summary, plant_series, report_csv, report_json};
pub use run_service::{
    ForecastRequest, ForecastResponse, build_orchestrator, build_sites, run_forecast,
};
