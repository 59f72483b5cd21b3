use crate::error::Result;
use crate::models::JoinedRecord;
use crate::processors::coordinate_validator::ValidationStats;
use crate::processors::station_aggregator::AggregationStats;
use crate::processors::station_deduplicator::DeduplicationStats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceSummary {
    pub min_km: f64,
    pub mean_km: f64,
    pub max_km: f64,
}

impl DistanceSummary {
    pub fn from_records(records: &[JoinedRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let (min, max, sum) = records.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), r| (min.min(r.distance_km), max.max(r.distance_km), sum + r.distance_km),
        );

        Some(Self {
            min_km: min,
            mean_km: sum / records.len() as f64,
            max_km: max,
        })
    }
}

/// Counts gathered across one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub subjects_read: usize,
    pub subjects_valid: usize,
    pub dropped_missing: usize,
    pub dropped_unparseable: usize,
    pub dropped_out_of_range: usize,
    pub dropped_filtered: usize,
    pub reading_rows: usize,
    pub stations: usize,
    pub station_conflicts: usize,
    pub readings: usize,
    pub null_readings: usize,
    pub aggregates: usize,
    pub records_joined: usize,
    pub records_without_metric: usize,
    pub distance: Option<DistanceSummary>,
    /// Number of subjects matched to each station
    pub matches_per_station: BTreeMap<String, usize>,
}

impl JoinReport {
    pub fn new(
        validation: &ValidationStats,
        dedup: &DeduplicationStats,
        aggregation: &AggregationStats,
        records: &[JoinedRecord],
    ) -> Self {
        let mut matches_per_station = BTreeMap::new();
        for record in records {
            *matches_per_station
                .entry(record.nearest_station_id.clone())
                .or_insert(0) += 1;
        }

        Self {
            subjects_read: validation.rows_read,
            subjects_valid: validation.accepted,
            dropped_missing: validation.missing_coordinate,
            dropped_unparseable: validation.unparseable_coordinate,
            dropped_out_of_range: validation.out_of_range,
            dropped_filtered: validation.filtered_out,
            reading_rows: dedup.rows_read,
            stations: dedup.stations,
            station_conflicts: dedup.conflicting_stations,
            readings: aggregation.readings,
            null_readings: aggregation.missing_values,
            aggregates: aggregation.stations_with_metric,
            records_joined: records.len(),
            records_without_metric: records.iter().filter(|r| !r.has_metric()).count(),
            distance: DistanceSummary::from_records(records),
            matches_per_station,
        }
    }

    pub fn subjects_dropped(&self) -> usize {
        self.dropped_missing + self.dropped_unparseable + self.dropped_out_of_range + self.dropped_filtered
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Join Report ===\n");
        summary.push_str(&format!("Subjects Read: {}\n", self.subjects_read));
        summary.push_str(&format!(
            "Subjects Valid: {} ({:.1}%)\n",
            self.subjects_valid,
            percentage(self.subjects_valid, self.subjects_read)
        ));
        summary.push_str(&format!(
            "Subjects Dropped: {} (missing {}, unparseable {}, out of range {}, filtered {})\n",
            self.subjects_dropped(),
            self.dropped_missing,
            self.dropped_unparseable,
            self.dropped_out_of_range,
            self.dropped_filtered
        ));
        summary.push_str(&format!(
            "\nStations: {} from {} reading rows ({} with conflicting positions)\n",
            self.stations, self.reading_rows, self.station_conflicts
        ));
        summary.push_str(&format!(
            "Readings: {} ({} null)\n",
            self.readings, self.null_readings
        ));
        summary.push_str(&format!("Stations With Mean: {}\n", self.aggregates));
        summary.push_str(&format!("\nRecords Joined: {}\n", self.records_joined));
        summary.push_str(&format!(
            "Records Without Metric: {} ({:.1}%)\n",
            self.records_without_metric,
            percentage(self.records_without_metric, self.records_joined)
        ));

        if let Some(distance) = &self.distance {
            summary.push_str(&format!(
                "Distance (km): min {:.3}, mean {:.3}, max {:.3}\n",
                distance.min_km, distance.mean_km, distance.max_km
            ));
        }

        if !self.matches_per_station.is_empty() {
            let mut busiest: Vec<(&String, &usize)> = self.matches_per_station.iter().collect();
            busiest.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            summary.push_str("\nTop 10 Stations By Matches:\n");
            for (i, (station_id, count)) in busiest.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. {}: {}\n", i + 1, station_id, count));
            }
        }

        summary
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}
