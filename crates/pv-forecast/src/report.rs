//! Forecast report, run manifest and fleet aggregation.

use pv_core::{ForecastEntry, PowerSeries, TimeRange, Timestamp};
use pv_model::{DeviceOutcome, ExecutionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Authoritative for its site in this run.
    Selected,
    /// Retrieved and convertible, but an earlier source was selected.
    Standby,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceManifest {
    pub site: String,
    pub name: String,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Records dropped as incomplete during conversion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantManifest {
    pub name: String,
    pub site: String,
    pub topology: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceOutcome>,
}

/// Execution status of every source, plant and device in a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub sources: Vec<SourceManifest>,
    pub plants: Vec<PlantManifest>,
}

impl Manifest {
    pub fn plant(&self, name: &str) -> Option<&PlantManifest> {
        self.plants.iter().find(|p| p.name == name)
    }

    pub fn source(&self, site: &str, name: &str) -> Option<&SourceManifest> {
        self.sources.iter().find(|s| s.site == site && s.name == name)
    }

    /// Number of plants with the given status.
    pub fn count(&self, status: ExecutionStatus) -> usize {
        self.plants.iter().filter(|p| p.status == status).count()
    }

    pub fn all_ok(&self) -> bool {
        self.plants.iter().all(|p| {
            p.status == ExecutionStatus::Ok && p.devices.iter().all(|d| d.status == ExecutionStatus::Ok)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantForecast {
    pub name: String,
    pub series: PowerSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub run_id: Uuid,
    pub generated_at: Timestamp,
    pub range: TimeRange,
    /// In configuration order.
    pub plants: Vec<PlantForecast>,
    /// Sum of non-null plant values per timestamp; null where no plant contributes.
    pub fleet: PowerSeries,
    pub manifest: Manifest,
}

impl ForecastReport {
    pub fn plant(&self, name: &str) -> Option<&PowerSeries> {
        self.plants.iter().find(|p| p.name == name).map(|p| &p.series)
    }
}

/// Pointwise sum over the union of all timestamps.
pub fn fleet_total<'a>(series: impl IntoIterator<Item = &'a PowerSeries>) -> PowerSeries {
    let mut totals: BTreeMap<Timestamp, Option<f64>> = BTreeMap::new();
    for s in series {
        for e in s.iter() {
            let slot = totals.entry(e.timestamp).or_insert(None);
            if let Some(v) = e.ac_power_w {
                *slot = Some(slot.unwrap_or(0.0) + v);
            }
        }
    }
    // BTreeMap keys are unique and sorted.
    PowerSeries::new(
        totals
            .into_iter()
            .map(|(t, v)| ForecastEntry::new(t, v))
            .collect(),
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn t(h: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap() + TimeDelta::hours(h)
    }

    #[test]
    fn no_contributor_is_null_but_zero_is_zero() {
        let a = PowerSeries::new(vec![
            ForecastEntry::new(t(0), None),
            ForecastEntry::new(t(1), Some(0.0)),
        ])
        .unwrap();
        let b = PowerSeries::new(vec![ForecastEntry::new(t(1), None)]).unwrap();
        let fleet = fleet_total([&a, &b]);
        assert_eq!(fleet.get(t(0)), Some(None));
        assert_eq!(fleet.get(t(1)), Some(Some(0.0)));
    }

    #[test]
    fn union_of_indexes_is_summed() {
        let a = PowerSeries::from_values([(t(0), 1.0), (t(1), 2.0)]).unwrap();
        let b = PowerSeries::from_values([(t(1), 10.0), (t(2), 20.0)]).unwrap();
        let fleet = fleet_total([&a, &b]);
        assert_eq!(fleet.timestamps(), vec![t(0), t(1), t(2)]);
        assert_eq!(fleet.get(t(1)), Some(Some(12.0)));
    }

    #[test]
    fn manifest_counts_statuses() {
        let manifest = Manifest {
            sources: vec![],
            plants: vec![PlantManifest {
                name: "a".into(),
                site: "s".into(),
                topology: "micro".into(),
                status: ExecutionStatus::Skipped,
                reason: Some("no weather".into()),
                devices: vec![],
            }],
        };
        assert_eq!(manifest.count(ExecutionStatus::Skipped), 1);
        assert!(!manifest.all_ok());
        assert!(manifest.plant("a").is_some());
    }
}
