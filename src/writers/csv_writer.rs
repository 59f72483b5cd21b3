use crate::error::Result;
use crate::models::JoinedRecord;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const JOIN_COLUMNS: [&str; 7] = [
    "latitude",
    "longitude",
    "nearest_station_id",
    "station_latitude",
    "station_longitude",
    "distance_km",
    "metric_value",
];

/// Flat CSV export: subject attributes (union of all names, first-seen
/// order) followed by the join columns.
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_records(&self, records: &[JoinedRecord], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_to(records, file)?;
        debug!("Exported {} records to {}", records.len(), path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, records: &[JoinedRecord], sink: W) -> Result<()> {
        let attribute_names = attribute_columns(records);
        let mut writer = csv::Writer::from_writer(sink);

        let header: Vec<&str> = attribute_names
            .iter()
            .map(String::as_str)
            .chain(JOIN_COLUMNS)
            .collect();
        writer.write_record(&header)?;

        for record in records {
            let mut row: Vec<String> = attribute_names
                .iter()
                .map(|name| record.attributes.value(name).as_text().unwrap_or_default())
                .collect();
            row.extend([
                record.latitude.to_string(),
                record.longitude.to_string(),
                record.nearest_station_id.clone(),
                record.station_latitude.to_string(),
                record.station_longitude.to_string(),
                record.distance_km.to_string(),
                record.metric_value.map(|v| v.to_string()).unwrap_or_default(),
            ]);
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute_columns(records: &[JoinedRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for (name, _) in record.attributes.iter() {
            if !names.iter().any(|n| n == name) && !JOIN_COLUMNS.contains(&name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JoinedRecordBuilder, RawRow, RawValue, SubjectPoint};

    fn record(species: &str, extra: Option<(&str, RawValue)>, metric: Option<f64>) -> JoinedRecord {
        let mut attrs: RawRow = [("species", RawValue::from(species))].into_iter().collect();
        if let Some((name, value)) = extra {
            attrs.insert(name, value);
        }
        let subject = SubjectPoint::try_new(38.0, -122.0, attrs).unwrap();
        JoinedRecordBuilder::new()
            .subject(&subject)
            .station("A".to_string(), 38.5, -122.0)
            .distance_km(55.6)
            .metric_value(metric)
            .build()
            .unwrap()
    }

    #[test]
    fn test_csv_export() -> Result<()> {
        let records = vec![
            record("Castor canadensis", None, Some(7.6)),
            record("Lontra canadensis", Some(("year", RawValue::Number(2021.0))), None),
        ];

        let mut buffer = Vec::new();
        CsvWriter::new().write_to(&records, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "species,year,latitude,longitude,nearest_station_id,station_latitude,station_longitude,distance_km,metric_value"
        );
        assert_eq!(lines[1], "Castor canadensis,,38,-122,A,38.5,-122,55.6,7.6");
        assert_eq!(lines[2], "Lontra canadensis,2021,38,-122,A,38.5,-122,55.6,");
        Ok(())
    }
}
