//! Weather source contract.

use async_trait::async_trait;
use pv_core::{TimeRange, WeatherSeries};

use crate::error::SourceResult;

/// Anything that can hand the pipeline a weather series for a time range.
///
/// Implementations normalize their own units and field names into
/// [`pv_core::WeatherRecord`]. Retry policy, if any, lives inside the
/// implementation; the pipeline calls `retrieve` at most once per run.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Name used in logs and in the run manifest.
    fn name(&self) -> &str;

    async fn retrieve(&self, range: TimeRange) -> SourceResult<WeatherSeries>;
}
