use core::fmt;
use serde::{Deserialize, Serialize};

/// Compact, stable identifier of one modeled device inside a plant.
///
/// - `array` is the 0-based array index in the plant definition
/// - `unit` is the 0-based inverter unit within that array
///
/// A string plant has exactly one device, `DeviceId::STRING`, covering all arrays.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId {
    pub array: u16,
    pub unit: u16,
}

impl DeviceId {
    pub const STRING: DeviceId = DeviceId { array: 0, unit: 0 };

    pub fn new(array: u16, unit: u16) -> Self {
        Self { array, unit }
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({}.{})", self.array, self.unit)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.array, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_array_major() {
        let mut ids = vec![
            DeviceId::new(1, 0),
            DeviceId::new(0, 2),
            DeviceId::new(0, 0),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![DeviceId::new(0, 0), DeviceId::new(0, 2), DeviceId::new(1, 0)]
        );
    }

    #[test]
    fn display_is_dotted() {
        assert_eq!(DeviceId::new(3, 7).to_string(), "3.7");
        assert_eq!(format!("{:?}", DeviceId::STRING), "DeviceId(0.0)");
    }
}
