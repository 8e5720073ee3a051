//! pv-forecast: orchestration of one forecast run.
//!
//! Contains:
//! - orchestrator (sites, weather fan-out and selection, plant fan-out)
//! - report (ForecastReport, manifest, fleet aggregation)
//! - cancel (run-level cancellation handle)
//! - error (ForecastError)

pub mod cancel;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use cancel::Cancellation;
pub use error::{ForecastError, ForecastResult};
pub use orchestrator::{DEFAULT_SOURCE_TIMEOUT, ForecastOrchestrator, Site};
pub use report::{
    ForecastReport, Manifest, PlantForecast, PlantManifest, SourceManifest, SourceStatus,
    fleet_total,
};
