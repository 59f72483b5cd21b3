use serde::{Deserialize, Serialize};

use crate::models::RawValue;

/// One timestamped measurement at a station. `value` is `None` when the raw
/// input could not be coerced to a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station_id: String,
    pub timestamp: String,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(station_id: impl Into<String>, timestamp: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            station_id: station_id.into(),
            timestamp: timestamp.into(),
            value,
        }
    }

    /// Coerce a raw value. Coercion failure is not an error, it is a missing reading.
    pub fn from_raw(station_id: impl Into<String>, timestamp: impl Into<String>, raw: &RawValue) -> Self {
        Self::new(station_id, timestamp, raw.as_f64())
    }
}

/// Mean of the non-null readings of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAggregate {
    pub station_id: String,
    pub metric_value: f64,
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_coercion() {
        let good = Reading::from_raw("A", "2024-01-01T00:00", &RawValue::from("7.2"));
        let bad = Reading::from_raw("A", "2024-01-01T00:15", &RawValue::from("bad"));
        let empty = Reading::from_raw("A", "2024-01-01T00:30", &RawValue::Null);

        assert_eq!(good.value, Some(7.2));
        assert_eq!(bad.value, None);
        assert_eq!(empty.value, None);
    }
}
