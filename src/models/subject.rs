use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::RawRow;

/// A validated occurrence point, the left side of the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubjectPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub attributes: RawRow,

    /// Natural-key fields captured from the full source row, so narrowing
    /// `attributes` never changes a record's identity.
    #[serde(default)]
    pub key_values: RawRow,
}

impl SubjectPoint {
    pub fn try_new(latitude: f64, longitude: f64, attributes: RawRow) -> Result<Self> {
        // validator's range check lets NaN through
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ProcessingError::InvalidCoordinate(format!(
                "Non-finite subject coordinate ({}, {})",
                latitude, longitude
            )));
        }

        let point = Self {
            latitude,
            longitude,
            attributes,
            key_values: RawRow::new(),
        };
        point.validate()?;
        Ok(point)
    }

    pub fn with_key_values(mut self, key_values: RawRow) -> Self {
        self.key_values = key_values;
        self
    }

    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attributes.value(name).as_text()
    }

    /// Text of a natural-key field. Captured key values win over attributes.
    pub fn key_text(&self, name: &str) -> Option<String> {
        match self.key_values.get(name) {
            Some(value) => value.as_text(),
            None => self.attribute_text(name),
        }
    }
}
