use crate::config::ReadingFields;
use crate::error::Result;
use crate::models::{RawRow, RawValue};
use crate::readers::format::{read_csv_rows, InputFormat};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

// USGS NWIS instantaneous-values response, only the parts the join needs.

#[derive(Deserialize)]
struct NwisResponse {
    value: NwisValue,
}

#[derive(Deserialize)]
struct NwisValue {
    #[serde(rename = "timeSeries")]
    time_series: Vec<NwisTimeSeries>,
}

#[derive(Deserialize)]
struct NwisTimeSeries {
    #[serde(rename = "sourceInfo")]
    source_info: NwisSourceInfo,
    #[serde(default)]
    values: Vec<NwisValueSet>,
}

#[derive(Deserialize)]
struct NwisSourceInfo {
    #[serde(rename = "siteName")]
    site_name: RawValue,
    #[serde(rename = "geoLocation")]
    geo_location: NwisGeoLocation,
}

#[derive(Deserialize)]
struct NwisGeoLocation {
    #[serde(rename = "geogLocation")]
    geog_location: NwisGeogLocation,
}

#[derive(Deserialize)]
struct NwisGeogLocation {
    #[serde(default)]
    latitude: RawValue,
    #[serde(default)]
    longitude: RawValue,
}

#[derive(Deserialize)]
struct NwisValueSet {
    #[serde(default)]
    value: Vec<NwisPoint>,
}

#[derive(Deserialize)]
struct NwisPoint {
    #[serde(rename = "dateTime", default)]
    date_time: RawValue,
    #[serde(default)]
    value: RawValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReadingDocument {
    Nwis(NwisResponse),
    Rows(Vec<RawRow>),
}

/// Reads raw reading rows from CSV, a JSON array of rows, or a USGS NWIS
/// instantaneous-values response (flattened to one row per reading).
pub struct ReadingReader {
    fields: ReadingFields,
}

impl ReadingReader {
    pub fn new(fields: ReadingFields) -> Self {
        Self { fields }
    }

    pub fn read_rows(&self, path: &Path) -> Result<Vec<RawRow>> {
        let format = InputFormat::from_path(path)?;
        let file = BufReader::new(File::open(path)?);
        let rows = self.read_rows_from(file, format)?;

        debug!("Read {} reading rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn read_rows_from<R: Read>(&self, reader: R, format: InputFormat) -> Result<Vec<RawRow>> {
        match format {
            InputFormat::Csv => read_csv_rows(reader),
            InputFormat::Json => match serde_json::from_reader(reader)? {
                ReadingDocument::Nwis(response) => Ok(self.flatten_time_series(response)),
                ReadingDocument::Rows(rows) => Ok(rows),
            },
        }
    }

    fn flatten_time_series(&self, response: NwisResponse) -> Vec<RawRow> {
        let mut rows = Vec::new();

        for series in response.value.time_series {
            let site = series.source_info;
            let location = site.geo_location.geog_location;

            // Only the first value set is used; additional sets are other methods/sensors.
            let points = series
                .values
                .into_iter()
                .next()
                .map(|set| set.value)
                .unwrap_or_default();

            if points.is_empty() {
                // Still emit the site so it takes part in matching.
                warn!(
                    "Site {:?} has no readings; it will match without an aggregate",
                    site.site_name.as_text()
                );
                rows.push(self.reading_row(&site.site_name, &location, RawValue::Null, RawValue::Null));
                continue;
            }

            for point in points {
                rows.push(self.reading_row(&site.site_name, &location, point.date_time, point.value));
            }
        }

        rows
    }

    fn reading_row(
        &self,
        site_name: &RawValue,
        location: &NwisGeogLocation,
        timestamp: RawValue,
        value: RawValue,
    ) -> RawRow {
        let mut row = RawRow::with_capacity(5);
        row.insert(self.fields.station_id_field.clone(), site_name.clone());
        row.insert(self.fields.latitude_field.clone(), location.latitude.clone());
        row.insert(self.fields.longitude_field.clone(), location.longitude.clone());
        row.insert(self.fields.timestamp_field.clone(), timestamp);
        row.insert(self.fields.value_field.clone(), value);
        row
    }
}

impl Default for ReadingReader {
    fn default() -> Self {
        Self::new(ReadingFields::default())
    }
}
