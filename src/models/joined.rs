use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::{RawRow, SubjectPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct JoinedRecord {
    pub attributes: RawRow,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(min = 1))]
    pub nearest_station_id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub station_latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub station_longitude: f64,

    #[validate(range(min = 0.0))]
    pub distance_km: f64,

    pub metric_value: Option<f64>,

    pub natural_key: String,
}

impl JoinedRecord {
    pub fn has_metric(&self) -> bool {
        self.metric_value.is_some()
    }

    /// Natural key used for skip-on-duplicate persistence: subject coordinates
    /// followed by the configured key fields, pipe separated.
    pub fn natural_key_for(subject: &SubjectPoint, key_fields: &[String]) -> String {
        let mut key = format!("{:.6}|{:.6}", subject.latitude, subject.longitude);
        for field in key_fields {
            key.push('|');
            if let Some(text) = subject.key_text(field) {
                key.push_str(&text);
            }
        }
        key
    }
}

pub struct JoinedRecordBuilder {
    attributes: Option<RawRow>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    nearest_station_id: Option<String>,
    station_latitude: Option<f64>,
    station_longitude: Option<f64>,
    distance_km: Option<f64>,
    metric_value: Option<f64>,
    natural_key: Option<String>,
}

impl Default for JoinedRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinedRecordBuilder {
    pub fn new() -> Self {
        Self {
            attributes: None,
            latitude: None,
            longitude: None,
            nearest_station_id: None,
            station_latitude: None,
            station_longitude: None,
            distance_km: None,
            metric_value: None,
            natural_key: None,
        }
    }

    pub fn subject(mut self, subject: &SubjectPoint) -> Self {
        self.attributes = Some(subject.attributes.clone());
        self.latitude = Some(subject.latitude);
        self.longitude = Some(subject.longitude);
        self
    }

    pub fn station(mut self, station_id: String, latitude: f64, longitude: f64) -> Self {
        self.nearest_station_id = Some(station_id);
        self.station_latitude = Some(latitude);
        self.station_longitude = Some(longitude);
        self
    }

    pub fn distance_km(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    pub fn metric_value(mut self, metric_value: Option<f64>) -> Self {
        self.metric_value = metric_value;
        self
    }

    pub fn natural_key(mut self, key: String) -> Self {
        self.natural_key = Some(key);
        self
    }

    pub fn build(self) -> Result<JoinedRecord> {
        let latitude = self
            .latitude
            .ok_or_else(|| ProcessingError::MissingData("latitude".to_string()))?;
        let longitude = self
            .longitude
            .ok_or_else(|| ProcessingError::MissingData("longitude".to_string()))?;

        let record = JoinedRecord {
            attributes: self.attributes.unwrap_or_default(),
            latitude,
            longitude,
            nearest_station_id: self
                .nearest_station_id
                .ok_or_else(|| ProcessingError::MissingData("nearest_station_id".to_string()))?,
            station_latitude: self
                .station_latitude
                .ok_or_else(|| ProcessingError::MissingData("station_latitude".to_string()))?,
            station_longitude: self
                .station_longitude
                .ok_or_else(|| ProcessingError::MissingData("station_longitude".to_string()))?,
            distance_km: self
                .distance_km
                .ok_or_else(|| ProcessingError::MissingData("distance_km".to_string()))?,
            metric_value: self.metric_value,
            natural_key: self
                .natural_key
                .unwrap_or_else(|| format!("{:.6}|{:.6}", latitude, longitude)),
        };

        record.validate()?;
        Ok(record)
    }
}
