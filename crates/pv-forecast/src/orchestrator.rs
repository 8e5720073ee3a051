//! Forecast orchestration.
//!
//! One run:
//!  1. Build plant models (hardware resolution). Configuration errors abort here.
//!  2. Query every weather source of every site that needs weather, concurrently,
//!     each under its site's timeout.
//!  3. Per site, select the first source in configuration order whose series
//!     survives conversion; later good sources are kept on standby.
//!  4. Run all plants in parallel on the selected, converted weather.
//!  5. Aggregate the fleet total and assemble the manifest.

use futures_util::future::join_all;
use pv_core::{Location, PlantSpec, PowerSeries, TimeRange, WeatherSeries};
use pv_model::{
    ConfigurationError, ExecutionStatus, HardwareDatabase, PhysicalModel, PlantModel, PlantRun,
};
use pv_weather::{
    AtmosphericConverter, SourceUnavailableError, UnavailableReason, WeatherSource,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::Cancellation;
use crate::error::{ForecastError, ForecastResult};
use crate::report::{
    ForecastReport, Manifest, PlantForecast, PlantManifest, SourceManifest, SourceStatus,
    fleet_total,
};

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// A location with its weather sources in order of preference.
#[derive(Clone)]
pub struct Site {
    pub id: String,
    pub location: Arc<Location>,
    pub sources: Vec<Arc<dyn WeatherSource>>,
    /// Per-source retrieval timeout
    pub timeout: Duration,
}

impl Site {
    pub fn new(id: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            location: Arc::new(location),
            sources: Vec::new(),
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn WeatherSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("id", &self.id)
            .field("location", &self.location)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct ForecastOrchestrator {
    sites: Vec<Site>,
    plants: Vec<PlantSpec>,
    hardware: Arc<dyn HardwareDatabase>,
    model: Arc<dyn PhysicalModel>,
    converter: AtmosphericConverter,
}

/// Outcome of weather selection for one site.
struct SiteWeather {
    series: Option<Arc<WeatherSeries>>,
    sources: Vec<SourceManifest>,
}

impl ForecastOrchestrator {
    pub fn new(
        sites: Vec<Site>,
        plants: Vec<PlantSpec>,
        hardware: Arc<dyn HardwareDatabase>,
        model: Arc<dyn PhysicalModel>,
    ) -> Self {
        Self {
            sites,
            plants,
            hardware,
            model,
            converter: AtmosphericConverter::default(),
        }
    }

    pub fn with_converter(mut self, converter: AtmosphericConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn plants(&self) -> &[PlantSpec] {
        &self.plants
    }

    fn site(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    /// Resolve every plant against its site and the hardware database.
    ///
    /// This is everything that can abort a run; nothing is executed.
    pub fn prepare(&self) -> Result<Vec<PlantModel>, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut models = Vec::with_capacity(self.plants.len());
        for spec in &self.plants {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigurationError::DuplicatePlant {
                    plant: spec.name.clone(),
                });
            }
            let site = self
                .site(&spec.site)
                .ok_or_else(|| ConfigurationError::UnknownSite {
                    plant: spec.name.clone(),
                    site: spec.site.clone(),
                })?;
            models.push(PlantModel::build(
                spec,
                Arc::clone(&site.location),
                self.hardware.as_ref(),
            )?);
        }
        Ok(models)
    }

    pub async fn run(&self, range: TimeRange) -> ForecastResult<ForecastReport> {
        self.run_with_cancel(range, &Cancellation::new()).await
    }

    /// Run, abandoning all pending work once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        range: TimeRange,
        cancel: &Cancellation,
    ) -> ForecastResult<ForecastReport> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("forecast run cancelled");
                Err(ForecastError::Cancelled)
            }
            result = self.execute(range, cancel) => result,
        }
    }

    async fn execute(&self, range: TimeRange, cancel: &Cancellation) -> ForecastResult<ForecastReport> {
        let run_id = Uuid::new_v4();
        let plants = self.prepare()?;
        info!(%run_id, plants = plants.len(), start = %range.start, end = %range.end, "forecast run started");

        let weather = self.gather_weather(range, &plants).await;
        if cancel.is_cancelled() {
            return Err(ForecastError::Cancelled);
        }

        let mut source_manifest = Vec::new();
        let mut selected: HashMap<String, Arc<WeatherSeries>> = HashMap::new();
        for (site_id, site_weather) in weather {
            source_manifest.extend(site_weather.sources);
            if let Some(series) = site_weather.series {
                selected.insert(site_id, series);
            }
        }

        let runs = self.run_plants(plants, selected, range, cancel).await?;

        let fleet = fleet_total(runs.iter().map(|(_, run)| &run.series));
        let mut forecasts = Vec::with_capacity(runs.len());
        let mut plant_manifest = Vec::with_capacity(runs.len());
        for (model, run) in runs {
            plant_manifest.push(PlantManifest {
                name: model.name().to_string(),
                site: model.site().to_string(),
                topology: model.topology().to_string(),
                status: run.status,
                reason: run.reason,
                devices: run.devices,
            });
            forecasts.push(PlantForecast {
                name: model.name().to_string(),
                series: run.series,
            });
        }

        let manifest = Manifest {
            sources: source_manifest,
            plants: plant_manifest,
        };
        info!(
            %run_id,
            ok = manifest.count(ExecutionStatus::Ok),
            degraded = manifest.count(ExecutionStatus::Degraded),
            skipped = manifest.count(ExecutionStatus::Skipped),
            "forecast run finished"
        );

        Ok(ForecastReport {
            run_id,
            generated_at: chrono::Utc::now(),
            range,
            plants: forecasts,
            fleet,
            manifest,
        })
    }

    /// Query the sources of every site some plant needs weather for.
    async fn gather_weather(&self, range: TimeRange, plants: &[PlantModel]) -> Vec<(String, SiteWeather)> {
        let needed: Vec<&Site> = self
            .sites
            .iter()
            .filter(|site| plants.iter().any(|p| p.needs_weather() && p.site() == site.id))
            .collect();

        let fetches = needed.iter().map(|site| async move {
            let results = join_all(site.sources.iter().map(|source| retrieve(source.as_ref(), range, site.timeout))).await;
            (*site, results)
        });

        join_all(fetches)
            .await
            .into_iter()
            .map(|(site, results)| (site.id.clone(), self.select(site, range, results)))
            .collect()
    }

    /// First source in configuration order with usable records wins. Every
    /// retrieved series is converted, so `Standby` means usable but not chosen.
    fn select(
        &self,
        site: &Site,
        range: TimeRange,
        results: Vec<Result<WeatherSeries, SourceUnavailableError>>,
    ) -> SiteWeather {
        let mut chosen: Option<Arc<WeatherSeries>> = None;
        let mut sources = Vec::with_capacity(results.len());

        for (source, result) in site.sources.iter().zip(results) {
            let mut entry = SourceManifest {
                site: site.id.clone(),
                name: source.name().to_string(),
                status: SourceStatus::Unavailable,
                reason: None,
                dropped: Vec::new(),
            };

            let converted = result.and_then(|raw| {
                let clipped = WeatherSeries::from_unordered(
                    raw.into_records()
                        .into_iter()
                        .filter(|r| range.contains(r.timestamp))
                        .collect(),
                );
                if clipped.is_empty() {
                    return Err(SourceUnavailableError::new(source.name(), UnavailableReason::Empty));
                }
                let conversion = self.converter.convert_lenient(&clipped, &site.location);
                if conversion.series.is_empty() {
                    // Non-empty input, so at least one record was dropped.
                    let first = conversion.dropped.into_iter().next();
                    return Err(SourceUnavailableError::new(
                        source.name(),
                        first.map_or(UnavailableReason::Empty, |first| UnavailableReason::Incomplete { first }),
                    ));
                }
                Ok(conversion)
            });

            match converted {
                Ok(conversion) if chosen.is_some() => {
                    debug!(site = %site.id, source = %source.name(), records = conversion.series.len(), "weather source on standby");
                    entry.status = SourceStatus::Standby;
                    entry.dropped = conversion.dropped.into_iter().map(|e| e.timestamp).collect();
                }
                Ok(conversion) => {
                    if !conversion.dropped.is_empty() {
                        warn!(site = %site.id, source = %source.name(), dropped = conversion.dropped.len(), "dropped incomplete weather records");
                    }
                    info!(site = %site.id, source = %source.name(), records = conversion.series.len(), "weather source selected");
                    entry.status = SourceStatus::Selected;
                    entry.dropped = conversion.dropped.into_iter().map(|e| e.timestamp).collect();
                    chosen = Some(Arc::new(conversion.series));
                }
                Err(e) => {
                    warn!(site = %site.id, source = %source.name(), error = %e, "weather source unavailable");
                    entry.reason = Some(e.reason.to_string());
                }
            }
            sources.push(entry);
        }

        if chosen.is_none() {
            warn!(site = %site.id, "no usable weather source; plants at this site are skipped");
        }
        SiteWeather {
            series: chosen,
            sources,
        }
    }

    /// Run every plant on the blocking pool. Output keeps configuration order.
    async fn run_plants(
        &self,
        plants: Vec<PlantModel>,
        weather: HashMap<String, Arc<WeatherSeries>>,
        range: TimeRange,
        cancel: &Cancellation,
    ) -> ForecastResult<Vec<(PlantModel, PlantRun)>> {
        let model = Arc::clone(&self.model);
        let cancel = cancel.clone();

        let runs = tokio::task::spawn_blocking(move || {
            let stop = || cancel.is_cancelled();
            let runs: Vec<Option<PlantRun>> = plants
                .par_iter()
                .map(|plant| run_plant(plant, model.as_ref(), weather.get(plant.site()), range, &stop))
                .collect();
            plants
                .into_iter()
                .zip(runs)
                .map(|(plant, run)| run.map(|r| (plant, r)))
                .collect::<Option<Vec<_>>>()
        })
        .await
        .map_err(|e| ForecastError::Worker {
            message: e.to_string(),
        })?;

        runs.ok_or(ForecastError::Cancelled)
    }
}

async fn retrieve(
    source: &dyn WeatherSource,
    range: TimeRange,
    timeout: Duration,
) -> Result<WeatherSeries, SourceUnavailableError> {
    match tokio::time::timeout(timeout, source.retrieve(range)).await {
        Ok(result) => result,
        Err(_) => Err(SourceUnavailableError::new(
            source.name(),
            UnavailableReason::Timeout { after: timeout },
        )),
    }
}

fn run_plant(
    plant: &PlantModel,
    model: &dyn PhysicalModel,
    weather: Option<&Arc<WeatherSeries>>,
    range: TimeRange,
    stop: &(dyn Fn() -> bool + Sync),
) -> Option<PlantRun> {
    if !plant.needs_weather() {
        let mut run = plant.run_until(model, &WeatherSeries::default(), stop)?;
        run.series = clip(&run.series, range);
        return Some(run);
    }
    match weather {
        Some(series) => plant.run_until(model, series, stop),
        None => {
            warn!(plant = plant.name(), site = plant.site(), "plant skipped, no weather");
            Some(plant.skipped("no weather source available for site"))
        }
    }
}

fn clip(series: &PowerSeries, range: TimeRange) -> PowerSeries {
    PowerSeries::new(
        series
            .iter()
            .filter(|e| range.contains(e.timestamp))
            .copied()
            .collect(),
    )
    .unwrap_or_default()
}
