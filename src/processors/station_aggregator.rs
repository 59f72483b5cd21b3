use crate::config::ReadingFields;
use crate::models::{RawRow, Reading, StationAggregate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub readings: usize,
    pub missing_values: usize,
    pub stations_with_metric: usize,
    /// Stations that reported only null or unparseable values
    pub stations_without_metric: usize,
}

/// Reduces readings to one mean value per station.
pub struct StationAggregator {
    fields: ReadingFields,
}

impl StationAggregator {
    pub fn new(fields: ReadingFields) -> Self {
        Self { fields }
    }

    /// Coerce raw rows into readings. Rows without a station id are skipped;
    /// uncoercible values become missing readings.
    pub fn readings_from_rows(&self, rows: &[RawRow]) -> Vec<Reading> {
        rows.iter()
            .filter_map(|row| {
                let station_id = row.value(&self.fields.station_id_field).as_text()?;
                let timestamp = row
                    .value(&self.fields.timestamp_field)
                    .as_text()
                    .unwrap_or_default();
                Some(Reading::from_raw(
                    station_id,
                    timestamp,
                    row.value(&self.fields.value_field),
                ))
            })
            .collect()
    }

    /// Mean of the non-null readings per station. A station whose readings are
    /// all missing has no entry.
    pub fn aggregate(&self, readings: &[Reading]) -> (BTreeMap<String, StationAggregate>, AggregationStats) {
        let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut stats = AggregationStats {
            readings: readings.len(),
            ..Default::default()
        };

        for reading in readings {
            seen.insert(reading.station_id.as_str());
            match reading.value {
                Some(value) => {
                    let entry = sums.entry(reading.station_id.as_str()).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
                None => stats.missing_values += 1,
            }
        }

        let aggregates: BTreeMap<String, StationAggregate> = sums
            .into_iter()
            .map(|(station_id, (sum, count))| {
                let aggregate = StationAggregate {
                    station_id: station_id.to_string(),
                    metric_value: sum / count as f64,
                    sample_count: count,
                };
                (station_id.to_string(), aggregate)
            })
            .collect();

        stats.stations_with_metric = aggregates.len();
        stats.stations_without_metric = seen.len() - aggregates.len();

        if stats.stations_without_metric > 0 {
            debug!(
                "{} stations have no usable readings",
                stats.stations_without_metric
            );
        }
        info!(
            stations = stats.stations_with_metric,
            missing = stats.missing_values,
            "Aggregated station readings"
        );

        (aggregates, stats)
    }

    pub fn aggregate_rows(&self, rows: &[RawRow]) -> (BTreeMap<String, StationAggregate>, AggregationStats) {
        let readings = self.readings_from_rows(rows);
        self.aggregate(&readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawValue;

    fn aggregator() -> StationAggregator {
        StationAggregator::new(ReadingFields::default())
    }

    fn row(site: &str, value: RawValue) -> RawRow {
        [
            ("site_name", RawValue::from(site)),
            ("latitude", RawValue::Number(38.01)),
            ("longitude", RawValue::Number(-122.0)),
            ("datetime", RawValue::from("2024-05-01T00:00")),
            ("dissolved_oxygen", value),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_mean_ignores_unparseable_values() {
        let rows = vec![
            row("A", RawValue::from("7.2")),
            row("A", RawValue::from("bad")),
            row("A", RawValue::from("8.0")),
        ];
        let (aggregates, stats) = aggregator().aggregate_rows(&rows);

        let a = &aggregates["A"];
        assert!((a.metric_value - 7.6).abs() < 1e-9);
        assert_eq!(a.sample_count, 2);
        assert_eq!(stats.missing_values, 1);
    }

    #[test]
    fn test_all_null_station_is_absent() {
        let rows = vec![
            row("A", RawValue::Number(5.0)),
            row("B", RawValue::Null),
            row("B", RawValue::from("")),
        ];
        let (aggregates, stats) = aggregator().aggregate_rows(&rows);

        assert!(aggregates.contains_key("A"));
        assert!(!aggregates.contains_key("B"));
        assert_eq!(stats.stations_without_metric, 1);
    }

    #[test]
    fn test_rows_without_station_id_skipped() {
        let rows = vec![row("A", RawValue::Number(5.0)), row("", RawValue::Number(9.0))];
        let readings = aggregator().readings_from_rows(&rows);

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp, "2024-05-01T00:00");
    }

    #[test]
    fn test_mean_within_reading_range() {
        let values = [6.1, 9.4, 7.7, 8.2, 5.9];
        let readings: Vec<Reading> = values
            .iter()
            .map(|v| Reading::new("S", "t", Some(*v)))
            .collect();
        let (aggregates, _) = aggregator().aggregate(&readings);

        let mean = aggregates["S"].metric_value;
        assert!(mean >= 5.9 && mean <= 9.4);
    }
}
