//! Built-in weather sources.

mod clearsky;
mod file;

pub use clearsky::ClearSkySource;
pub use file::{FileFormat, FileSource};
