use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use pv_app::{
    AppError, AppResult, ForecastRequest, get_report_summary, list_plants, project_service,
    report_csv, report_json, run_service,
};
use pv_core::TimeRange;
use pv_forecast::SourceStatus;
use pv_weather::SourceRegistry;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pv-cli")]
#[command(about = "pvcast CLI - photovoltaic power forecasts", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, pv_forecast=debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file, weather sources and hardware references
    Validate {
        /// Path to the project YAML/JSON file
        project_path: PathBuf,
    },
    /// List plants in a project
    Plants {
        /// Path to the project YAML/JSON file
        project_path: PathBuf,
    },
    /// Run a forecast
    Forecast {
        /// Path to the project YAML/JSON file
        project_path: PathBuf,
        /// Start of the forecast window, RFC 3339 (defaults to the current hour)
        #[arg(long)]
        start: Option<String>,
        /// Length of the forecast window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Plants { project_path } => cmd_plants(&project_path),
        Commands::Forecast {
            project_path,
            start,
            hours,
            format,
            output,
        } => cmd_forecast(&project_path, start.as_deref(), hours, format, output.as_deref()),
    }
}

fn project_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project, project_dir(project_path), &SourceRegistry::with_builtin())?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_plants(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let plants = list_plants(&project);

    if plants.is_empty() {
        println!("No plants found in project");
    } else {
        println!("Plants in project:");
        for plant in plants {
            println!(
                "  {} @ {} - {} ({} arrays, {} model runs)",
                plant.name, plant.site, plant.topology, plant.array_count, plant.device_count
            );
        }
    }
    Ok(())
}

fn parse_start(start: Option<&str>) -> AppResult<DateTime<Utc>> {
    match start {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AppError::InvalidInput(format!("--start '{s}': {e}"))),
        None => Utc::now()
            .duration_trunc(TimeDelta::hours(1))
            .map_err(|e| AppError::InvalidInput(e.to_string())),
    }
}

fn cmd_forecast(
    project_path: &Path,
    start: Option<&str>,
    hours: u32,
    format: Format,
    output: Option<&Path>,
) -> AppResult<()> {
    let range = TimeRange::hours_from(parse_start(start)?, hours)?;
    let request = ForecastRequest {
        project_path,
        range,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let response = runtime.block_on(run_service::run_forecast(&request))?;
    let report = &response.report;

    let content = match format {
        Format::Json => report_json(report)?,
        Format::Csv => report_csv(report)?,
    };
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        print!("{}", content);
    }

    // Summary goes to stderr so stdout stays machine-readable.
    let summary = get_report_summary(report);
    eprintln!("✓ Forecast {} completed in {:.2}s", report.run_id, response.elapsed_s);
    eprintln!(
        "  Plants: {} ok, {} degraded, {} skipped",
        summary.ok, summary.degraded, summary.skipped
    );
    for source in &report.manifest.sources {
        let status = match source.status {
            SourceStatus::Selected => "selected",
            SourceStatus::Standby => "standby",
            SourceStatus::Unavailable => "unavailable",
        };
        match &source.reason {
            Some(reason) => eprintln!("  Source {}/{}: {} ({})", source.site, source.name, status, reason),
            None => eprintln!("  Source {}/{}: {}", source.site, source.name, status),
        }
    }
    for plant in report.manifest.plants.iter().filter(|p| p.reason.is_some()) {
        eprintln!(
            "  Plant {}: {} ({})",
            plant.name,
            plant.status.as_str(),
            plant.reason.as_deref().unwrap_or_default()
        );
    }
    eprintln!("  Fleet energy: {:.0} Wh over {} points", summary.fleet_energy_wh, summary.fleet_points);
    if let Some(path) = output {
        eprintln!("  Written to {}", path.display());
    }
    Ok(())
}
