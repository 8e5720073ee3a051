//! Geographic location of a site or plant.

use serde::{Deserialize, Serialize};

/// Site coordinates.
///
/// Shared by reference (`Arc<Location>` in the runtime config) across every plant
/// of a site unless a plant carries its own override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north, -90..=90
    pub latitude: f64,
    /// Degrees east, -180..=180
    pub longitude: f64,
    /// IANA timezone identifier, e.g. "Europe/Amsterdam". Series stay in UTC;
    /// the identifier is carried for consumers that render local time.
    pub timezone: String,
    /// Meters above sea level
    #[serde(default)]
    pub altitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, timezone: impl Into<String>, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timezone: timezone.into(),
            altitude,
        }
    }
}
