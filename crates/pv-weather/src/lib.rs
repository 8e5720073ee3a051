//! pv-weather: weather retrieval and atmospheric completion.
//!
//! Contains:
//! - source (the `WeatherSource` contract)
//! - sources (built-in file and clear-sky sources)
//! - registry (source type tag -> constructor)
//! - solar (sun position, clear-sky and decomposition models)
//! - atmospheric (completion of records into GHI/DNI/DHI + precipitable water)
//! - error (incomplete data, unavailable source, registry errors)

pub mod atmospheric;
pub mod error;
pub mod registry;
pub mod solar;
pub mod source;
pub mod sources;

pub use atmospheric::{AtmosphericConverter, Conversion, precipitable_water};
pub use error::{
    DataIncompleteError, RegistryError, SourceResult, SourceUnavailableError, UnavailableReason,
};
pub use registry::{SourceConfig, SourceFactory, SourceRegistry};
pub use source::WeatherSource;
pub use sources::{ClearSkySource, FileSource};
