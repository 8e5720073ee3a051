//! AC power series and forecast time ranges.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{PvError, PvResult, Timestamp};

/// Half-open forecast window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> PvResult<Self> {
        if end <= start {
            return Err(PvError::InvalidArg {
                what: "time range end must be after start",
            });
        }
        Ok(Self { start, end })
    }

    /// Window of `hours` starting at `start`.
    pub fn hours_from(start: Timestamp, hours: u32) -> PvResult<Self> {
        Self::new(start, start + TimeDelta::hours(i64::from(hours)))
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Evenly spaced timestamps from `start` (inclusive) to `end` (exclusive).
    pub fn steps(&self, interval: TimeDelta) -> PvResult<Vec<Timestamp>> {
        if interval <= TimeDelta::zero() {
            return Err(PvError::InvalidArg {
                what: "step interval must be positive",
            });
        }
        let mut out = Vec::new();
        let mut t = self.start;
        while t < self.end {
            out.push(t);
            t += interval;
        }
        Ok(out)
    }
}

/// One forecast value.
///
/// `ac_power_w == None` means "no value": the model failed for this timestamp, or
/// (for a fleet total) no plant contributed. It is never the same as zero watts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: Timestamp,
    pub ac_power_w: Option<f64>,
}

impl ForecastEntry {
    pub fn new(timestamp: Timestamp, ac_power_w: Option<f64>) -> Self {
        Self {
            timestamp,
            ac_power_w,
        }
    }
}

/// Time-indexed AC power with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastEntry>", into = "Vec<ForecastEntry>")]
pub struct PowerSeries {
    entries: Vec<ForecastEntry>,
}

impl PowerSeries {
    pub fn new(entries: Vec<ForecastEntry>) -> PvResult<Self> {
        for pair in entries.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(PvError::UnorderedTimestamps {
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Build from `(timestamp, watts)` pairs.
    pub fn from_values(values: impl IntoIterator<Item = (Timestamp, f64)>) -> PvResult<Self> {
        Self::new(
            values
                .into_iter()
                .map(|(t, w)| ForecastEntry::new(t, Some(w)))
                .collect(),
        )
    }

    /// All-zero series over the given (already ordered) index.
    pub fn zeros(timestamps: &[Timestamp]) -> Self {
        Self {
            entries: timestamps
                .iter()
                .map(|&t| ForecastEntry::new(t, Some(0.0)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ForecastEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForecastEntry> {
        self.entries.iter()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.entries.iter().map(|e| e.timestamp).collect()
    }

    /// Value at `ts`; outer `None` when the timestamp is not in the index.
    pub fn get(&self, ts: Timestamp) -> Option<Option<f64>> {
        self.entries
            .binary_search_by(|e| e.timestamp.cmp(&ts))
            .ok()
            .map(|i| self.entries[i].ac_power_w)
    }

    /// Number of entries carrying no value.
    pub fn null_count(&self) -> usize {
        self.entries.iter().filter(|e| e.ac_power_w.is_none()).count()
    }

    /// Energy in Wh, treating each value as the mean power from its timestamp to
    /// the next one. The last entry reuses the preceding interval. Null entries
    /// contribute nothing.
    pub fn total_energy_wh(&self) -> f64 {
        if self.entries.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut last_step_h = 0.0;
        for (i, entry) in self.entries.iter().enumerate() {
            let step_h = match self.entries.get(i + 1) {
                Some(next) => (next.timestamp - entry.timestamp).num_seconds() as f64 / 3600.0,
                None => last_step_h,
            };
            last_step_h = step_h;
            if let Some(w) = entry.ac_power_w {
                total += w * step_h;
            }
        }
        total
    }
}

impl TryFrom<Vec<ForecastEntry>> for PowerSeries {
    type Error = PvError;

    fn try_from(entries: Vec<ForecastEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<PowerSeries> for Vec<ForecastEntry> {
    fn from(series: PowerSeries) -> Self {
        series.entries
    }
}
