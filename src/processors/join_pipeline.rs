use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{JoinedRecord, RawRow, StationAggregate, StationLocation};
use crate::processors::{
    CoordinateValidator, JoinAssembler, JoinReport, NearestMatcher, StationAggregator, StationDeduplicator,
};
use crate::readers::SourceData;
use crate::utils::progress::ProgressReporter;
use tracing::{info, warn};

/// One row of the station overview: location plus its mean reading, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSummary {
    pub station: StationLocation,
    pub aggregate: Option<StationAggregate>,
}

/// Runs validation, deduplication, aggregation, matching and assembly in
/// order. Each stage consumes the full output of the one before it.
pub struct JoinPipeline {
    config: PipelineConfig,
}

impl JoinPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_sources(
        &self,
        sources: &SourceData,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<JoinedRecord>, JoinReport)> {
        self.run(&sources.subject_rows, &sources.reading_rows, progress)
    }

    /// Join raw subject rows to raw reading rows. Either every valid subject
    /// gets a record or the run fails; there is no partial result.
    pub fn run(
        &self,
        subject_rows: &[RawRow],
        reading_rows: &[RawRow],
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<JoinedRecord>, JoinReport)> {
        if let Some(p) = progress {
            p.set_message("Validating subject coordinates...");
        }

        let validator =
            CoordinateValidator::new(&self.config.subject).with_filter(self.config.filter.clone());
        let (subjects, validation) = validator.validate(subject_rows);

        if subjects.is_empty() {
            return Err(ProcessingError::NoSubjectsAvailable {
                read: validation.rows_read,
                dropped: validation.dropped(),
            });
        }

        if let Some(p) = progress {
            p.set_message("Deduplicating stations...");
        }

        let (stations, dedup) = StationDeduplicator::new(self.config.reading.clone())
            .with_policy(self.config.conflict_policy)
            .deduplicate(reading_rows);

        if stations.is_empty() {
            warn!(
                "No usable stations in {} reading rows ({} without id, {} with bad coordinates)",
                dedup.rows_read, dedup.missing_station_id, dedup.invalid_coordinates
            );
        }

        if let Some(p) = progress {
            p.set_message("Aggregating readings...");
        }

        let (aggregates, aggregation) =
            StationAggregator::new(self.config.reading.clone()).aggregate_rows(reading_rows);

        let matches = NearestMatcher::from_config(&self.config).match_all(&subjects, &stations, progress)?;

        if let Some(p) = progress {
            p.set_message("Assembling joined records...");
        }

        let records = JoinAssembler::new(self.config.subject.natural_key_fields.clone())
            .assemble(&subjects, &matches, &stations, &aggregates)?;

        let report = JoinReport::new(&validation, &dedup, &aggregation, &records);

        info!(
            subjects_valid = report.subjects_valid,
            subjects_dropped = report.subjects_dropped(),
            stations = report.stations,
            records = report.records_joined,
            without_metric = report.records_without_metric,
            "Join complete"
        );

        Ok((records, report))
    }

    /// Deduplicated stations with their aggregates, in station id order.
    pub fn station_summary(&self, reading_rows: &[RawRow]) -> Vec<StationSummary> {
        let (stations, _) = StationDeduplicator::new(self.config.reading.clone())
            .with_policy(self.config.conflict_policy)
            .deduplicate(reading_rows);
        let (mut aggregates, _) =
            StationAggregator::new(self.config.reading.clone()).aggregate_rows(reading_rows);

        stations
            .iter()
            .map(|station| StationSummary {
                station: station.clone(),
                aggregate: aggregates.remove(&station.station_id),
            })
            .collect()
    }
}

impl Default for JoinPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchStrategy;
    use crate::models::RawValue;

    fn subject(lat: f64, lon: f64) -> RawRow {
        [
            ("species", RawValue::from("Castor canadensis")),
            ("decimalLatitude", RawValue::Number(lat)),
            ("decimalLongitude", RawValue::Number(lon)),
            ("year", RawValue::Number(2021.0)),
        ]
        .into_iter()
        .collect()
    }

    fn reading(site: &str, lat: f64, lon: f64, value: &str) -> RawRow {
        [
            ("site_name", RawValue::from(site)),
            ("latitude", RawValue::Number(lat)),
            ("longitude", RawValue::Number(lon)),
            ("datetime", RawValue::from("2024-05-01T00:00")),
            ("dissolved_oxygen", RawValue::from(value)),
        ]
        .into_iter()
        .collect()
    }

    fn readings() -> Vec<RawRow> {
        vec![
            reading("A", 38.01, -122.0, "7.2"),
            reading("A", 38.01, -122.0, "bad"),
            reading("A", 38.01, -122.0, "8.0"),
            reading("B", 39.5, -120.0, ""),
        ]
    }

    #[test]
    fn test_end_to_end_join() {
        let subjects = vec![subject(38.0, -122.0), subject(39.4, -120.1), RawRow::new()];
        let (records, report) = JoinPipeline::default().run(&subjects, &readings(), None).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].nearest_station_id, "A");
        assert!((records[0].metric_value.unwrap() - 7.6).abs() < 1e-9);
        assert!((records[0].distance_km - 1.11).abs() < 0.01);
        assert_eq!(records[1].nearest_station_id, "B");
        assert_eq!(records[1].metric_value, None);

        assert_eq!(report.subjects_read, 3);
        assert_eq!(report.subjects_dropped(), 1);
        assert_eq!(report.stations, 2);
        assert_eq!(report.records_without_metric, 1);
    }

    #[test]
    fn test_no_stations_is_fatal() {
        let result = JoinPipeline::default().run(&[subject(38.0, -122.0)], &[], None);
        assert!(matches!(result, Err(ProcessingError::NoStationsAvailable { .. })));
    }

    #[test]
    fn test_no_valid_subjects_is_fatal() {
        let result = JoinPipeline::default().run(&[RawRow::new()], &readings(), None);
        assert!(matches!(
            result,
            Err(ProcessingError::NoSubjectsAvailable { read: 1, dropped: 1 })
        ));
    }

    #[test]
    fn test_sexagesimal_subject_is_dropped() {
        let mut dms = subject(0.0, 0.0);
        dms.insert("decimalLatitude", RawValue::from("38:00:00"));
        dms.insert("decimalLongitude", RawValue::from("-122:00:00"));

        let (records, report) = JoinPipeline::default()
            .run(&[dms.clone(), subject(38.0, -122.0)], &readings(), None)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.dropped_unparseable, 1);

        let result = JoinPipeline::default().run(&[dms], &readings(), None);
        assert!(matches!(
            result,
            Err(ProcessingError::NoSubjectsAvailable { read: 1, dropped: 1 })
        ));
    }

    #[test]
    fn test_strategies_agree() {
        let subjects: Vec<RawRow> = (0..50)
            .map(|i| subject(37.0 + i as f64 * 0.05, -123.0 + i as f64 * 0.07))
            .collect();

        let run = |strategy| {
            let config = PipelineConfig {
                match_strategy: strategy,
                max_workers: 2,
                chunk_size: 7,
                ..Default::default()
            };
            JoinPipeline::new(config).run(&subjects, &readings(), None).unwrap().0
        };

        assert_eq!(run(MatchStrategy::Sequential), run(MatchStrategy::Parallel));
    }

    #[test]
    fn test_station_summary() {
        let summary = JoinPipeline::default().station_summary(&readings());

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].station.station_id, "A");
        assert_eq!(summary[0].aggregate.as_ref().map(|a| a.sample_count), Some(2));
        assert!(summary[1].aggregate.is_none());
    }
}
