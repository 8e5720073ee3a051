//! pv-core: shared data contracts for the pvcast forecast pipeline.
//!
//! Contains:
//! - location (site coordinates and timezone identifier)
//! - plant (arrays, inverter references, topology, plant definitions)
//! - weather (normalized weather records and ordered series)
//! - series (AC power entries, power series, time ranges)
//! - ids (device identifiers inside a plant)
//! - numeric (float helpers for optional measurements)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod location;
pub mod numeric;
pub mod plant;
pub mod series;
pub mod weather;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PvError, PvResult};
pub use ids::DeviceId;
pub use location::Location;
pub use numeric::{finite, is_non_negative};
pub use plant::{ArraySpec, InverterRef, PlantSpec, Topology};
pub use series::{ForecastEntry, PowerSeries, TimeRange};
pub use weather::{WeatherRecord, WeatherSeries};

/// Timestamp type used throughout the pipeline. All series are indexed in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
