//! Report summaries and export.

use pv_core::PowerSeries;
use pv_forecast::{ForecastReport, SourceStatus};
use pv_model::ExecutionStatus;

use crate::error::{AppError, AppResult};

/// Short account of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub plant_count: usize,
    pub ok: usize,
    pub degraded: usize,
    pub skipped: usize,
    pub unavailable_sources: usize,
    pub fleet_points: usize,
    pub fleet_energy_wh: f64,
}

pub fn get_report_summary(report: &ForecastReport) -> ReportSummary {
    let m = &report.manifest;
    ReportSummary {
        plant_count: m.plants.len(),
        ok: m.count(ExecutionStatus::Ok),
        degraded: m.count(ExecutionStatus::Degraded),
        skipped: m.count(ExecutionStatus::Skipped),
        unavailable_sources: m
            .sources
            .iter()
            .filter(|s| s.status == SourceStatus::Unavailable)
            .count(),
        fleet_points: report.fleet.len(),
        fleet_energy_wh: report.fleet.total_energy_wh(),
    }
}

pub fn plant_series<'a>(report: &'a ForecastReport, plant: &str) -> AppResult<&'a PowerSeries> {
    report
        .plant(plant)
        .ok_or_else(|| AppError::PlantNotFound(plant.to_string()))
}

pub fn report_json(report: &ForecastReport) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One row per fleet timestamp, one column per plant plus the fleet total.
/// Null values are left empty; plant names are quoted where needed.
pub fn report_csv(report: &ForecastReport) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["timestamp"];
    header.extend(report.plants.iter().map(|p| p.name.as_str()));
    header.push("fleet");
    writer.write_record(&header)?;

    let cell = |v: Option<Option<f64>>| match v.flatten() {
        Some(w) => format!("{w}"),
        None => String::new(),
    };

    for entry in report.fleet.iter() {
        let mut row = Vec::with_capacity(report.plants.len() + 2);
        row.push(entry.timestamp.to_rfc3339());
        row.extend(report.plants.iter().map(|p| cell(p.series.get(entry.timestamp))));
        row.push(cell(Some(entry.ac_power_w)));
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pv_core::{ForecastEntry, TimeRange};
    use pv_forecast::{Manifest, PlantForecast, fleet_total};
    use uuid::Uuid;

    fn report(names: &[&str]) -> ForecastReport {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let plants: Vec<PlantForecast> = names
            .iter()
            .map(|n| PlantForecast {
                name: n.to_string(),
                series: PowerSeries::new(vec![ForecastEntry::new(t0, Some(5.0))]).unwrap(),
            })
            .collect();
        ForecastReport {
            run_id: Uuid::nil(),
            generated_at: t0,
            range: TimeRange::hours_from(t0, 1).unwrap(),
            fleet: fleet_total(plants.iter().map(|p| &p.series)),
            plants,
            manifest: Manifest::default(),
        }
    }

    fn columns(line: &str) -> usize {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        reader.records().next().unwrap().unwrap().len()
    }

    #[test]
    fn plant_names_with_separators_are_quoted() {
        let csv = report_csv(&report(&["Roof, south", "Shed \"B\""])).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,\"Roof, south\",\"Shed \"\"B\"\"\",fleet");
        assert_eq!(columns(lines[0]), 4);
        assert_eq!(columns(lines[1]), 4);
        assert!(lines[1].ends_with(",5,5,10"));
    }

    #[test]
    fn null_fleet_value_is_an_empty_cell() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let mut r = report(&["house"]);
        r.plants[0].series = PowerSeries::new(vec![ForecastEntry::new(t0, None)]).unwrap();
        r.fleet = fleet_total(r.plants.iter().map(|p| &p.series));
        let csv = report_csv(&r).unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), format!("{},,", t0.to_rfc3339()));
    }
}
