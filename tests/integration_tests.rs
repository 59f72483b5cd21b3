use std::io::Write;

use tempfile::TempDir;
use validator::Validate;
use watershed_join::config::{MatchStrategy, PipelineConfig, SubjectFields};
use watershed_join::models::{RawRow, RawValue};
use watershed_join::processors::JoinPipeline;
use watershed_join::readers::ConcurrentReader;
use watershed_join::writers::{CsvWriter, JoinedRecordRepository, ParquetRepository, ParquetWriter};
use watershed_join::ProcessingError;

const OCCURRENCES: &str = r#"{
  "offset": 0,
  "limit": 300,
  "endOfRecords": true,
  "results": [
    {"species": "Castor canadensis", "decimalLatitude": 38.0, "decimalLongitude": -122.0,
     "stateProvince": "California", "year": 2021, "month": 6, "day": 14},
    {"species": "Castor canadensis", "decimalLatitude": 39.45, "decimalLongitude": -120.05,
     "stateProvince": "California", "year": 2022, "month": 7, "day": 2},
    {"species": "Castor canadensis", "decimalLatitude": null, "decimalLongitude": -121.0,
     "stateProvince": "California", "year": 2020, "month": 1, "day": 1},
    {"species": "Castor canadensis", "decimalLatitude": 45.5, "decimalLongitude": -122.6,
     "stateProvince": "Oregon", "year": 2019, "month": 3, "day": 9}
  ]
}"#;

fn nwis_series(site: &str, lat: f64, lon: f64, values: &[&str]) -> String {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                r#"{{"value": "{}", "qualifiers": ["P"], "dateTime": "2024-05-01T00:{:02}:00.000-07:00"}}"#,
                v,
                i * 15
            )
        })
        .collect();

    format!(
        r#"{{
  "sourceInfo": {{
    "siteName": "{}",
    "siteCode": [{{"value": "11458000"}}],
    "geoLocation": {{"geogLocation": {{"srs": "EPSG:4326", "latitude": {}, "longitude": {}}}}}
  }},
  "variable": {{"variableCode": [{{"value": "00300"}}]}},
  "values": [{{"value": [{}]}}]
}}"#,
        site,
        lat,
        lon,
        points.join(",")
    )
}

fn write_inputs(dir: &TempDir) -> std::io::Result<(std::path::PathBuf, std::path::PathBuf)> {
    let subjects = dir.path().join("occurrences.json");
    std::fs::File::create(&subjects)?.write_all(OCCURRENCES.as_bytes())?;

    let readings = dir.path().join("usgs.json");
    let body = format!(
        r#"{{"value": {{"timeSeries": [{}, {}]}}}}"#,
        nwis_series("A", 38.01, -122.0, &["7.2", "bad", "8.0"]),
        nwis_series("B", 39.5, -120.0, &[""])
    );
    std::fs::File::create(&readings)?.write_all(body.as_bytes())?;

    Ok((subjects, readings))
}

#[tokio::test]
async fn test_join_files_end_to_end() -> watershed_join::Result<()> {
    let dir = TempDir::new()?;
    let (subjects, readings) = write_inputs(&dir)?;

    let config = PipelineConfig::default();
    let sources = ConcurrentReader::new(config.reading.clone())
        .read_sources(&subjects, &readings)
        .await?;
    let (records, report) = JoinPipeline::new(config).run_sources(&sources, None)?;

    assert_eq!(records.len(), 3);
    assert_eq!(report.subjects_read, 4);
    assert_eq!(report.dropped_missing, 1);
    assert_eq!(report.stations, 2);

    let first = &records[0];
    assert_eq!(first.nearest_station_id, "A");
    assert!((first.distance_km - 1.11).abs() < 0.01);
    assert!((first.metric_value.unwrap() - 7.6).abs() < 1e-9);
    assert_eq!(first.natural_key, "38.000000|-122.000000|2021|6|14");

    assert_eq!(records[1].nearest_station_id, "B");
    assert_eq!(records[1].metric_value, None);

    for record in &records {
        assert!(record.validate().is_ok());
    }
    Ok(())
}

#[tokio::test]
async fn test_attribute_filter_restricts_subjects() -> watershed_join::Result<()> {
    let dir = TempDir::new()?;
    let (subjects, readings) = write_inputs(&dir)?;

    let config = PipelineConfig::default().with_filter(Some(
        watershed_join::config::AttributeFilter::parse("stateProvince=California")?,
    ));
    let sources = ConcurrentReader::new(config.reading.clone())
        .read_sources(&subjects, &readings)
        .await?;
    let (records, report) = JoinPipeline::new(config).run_sources(&sources, None)?;

    assert_eq!(records.len(), 2);
    assert_eq!(report.dropped_filtered, 1);
    Ok(())
}

#[tokio::test]
async fn test_repository_is_idempotent_across_runs() -> watershed_join::Result<()> {
    let dir = TempDir::new()?;
    let (subjects, readings) = write_inputs(&dir)?;
    let output = dir.path().join("out").join("joined.parquet");

    let config = PipelineConfig {
        match_strategy: MatchStrategy::Sequential,
        ..Default::default()
    };
    let sources = ConcurrentReader::new(config.reading.clone())
        .read_sources(&subjects, &readings)
        .await?;
    let (records, _) = JoinPipeline::new(config).run_sources(&sources, None)?;

    let repository = ParquetRepository::new(&output, ParquetWriter::new());
    let first = repository.upsert(&records)?;
    let second = repository.upsert(&records)?;

    assert_eq!(first.inserted, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);

    let stored = repository.load_all()?;
    assert_eq!(stored, records);

    let info = ParquetWriter::new().get_file_info(&output)?;
    assert_eq!(info.total_rows, 3);

    let csv_path = dir.path().join("out").join("joined.csv");
    CsvWriter::new().write_records(&stored, &csv_path)?;
    let csv_text = std::fs::read_to_string(&csv_path)?;
    assert_eq!(csv_text.lines().count(), 4);
    Ok(())
}

#[test]
fn test_narrowed_attributes_keep_distinct_keys() -> watershed_join::Result<()> {
    let dir = TempDir::new()?;
    let occurrence = |year: f64| -> RawRow {
        [
            ("species", RawValue::from("Castor canadensis")),
            ("decimalLatitude", RawValue::Number(38.0)),
            ("decimalLongitude", RawValue::Number(-122.0)),
            ("year", RawValue::Number(year)),
            ("month", RawValue::Number(6.0)),
            ("day", RawValue::Number(14.0)),
        ]
        .into_iter()
        .collect()
    };
    let station: RawRow = [
        ("site_name", RawValue::from("A")),
        ("latitude", RawValue::Number(38.01)),
        ("longitude", RawValue::Number(-122.0)),
        ("dissolved_oxygen", RawValue::from("7.2")),
    ]
    .into_iter()
    .collect();

    let config = PipelineConfig {
        subject: SubjectFields {
            attribute_fields: vec!["species".to_string()],
            ..SubjectFields::default()
        },
        ..Default::default()
    };
    let (records, _) =
        JoinPipeline::new(config).run(&[occurrence(2020.0), occurrence(2021.0)], &[station], None)?;

    assert_eq!(records[0].natural_key, "38.000000|-122.000000|2020|6|14");
    assert_eq!(records[1].natural_key, "38.000000|-122.000000|2021|6|14");
    assert_eq!(records[0].attributes.len(), 1);

    let repository = ParquetRepository::new(dir.path().join("joined.parquet"), ParquetWriter::new());
    let outcome = repository.upsert(&records)?;
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.skipped, 0);
    Ok(())
}

#[test]
fn test_empty_station_source_aborts_run() {
    let dir = TempDir::new().unwrap();
    let (subjects, _) = write_inputs(&dir).unwrap();
    let subject_rows = watershed_join::readers::SubjectReader::new()
        .read_rows(&subjects)
        .unwrap();

    let result = JoinPipeline::default().run(&subject_rows, &[], None);

    match result {
        Err(e @ ProcessingError::NoStationsAvailable { .. }) => assert!(e.is_structural()),
        other => panic!("expected NoStationsAvailable, got {:?}", other.map(|(r, _)| r.len())),
    }
}
