use crate::config::{AttributeFilter, SubjectFields};
use crate::models::{RawRow, RawValue, SubjectPoint};
use crate::utils::coordinates::{is_valid_latitude, is_valid_longitude};
use tracing::{debug, info, warn};

/// Why a raw row did not become a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingCoordinate,
    UnparseableCoordinate,
    OutOfRange,
    FilteredOut,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub rows_read: usize,
    pub accepted: usize,
    pub missing_coordinate: usize,
    pub unparseable_coordinate: usize,
    pub out_of_range: usize,
    pub filtered_out: usize,
}

impl ValidationStats {
    pub fn dropped(&self) -> usize {
        self.missing_coordinate + self.unparseable_coordinate + self.out_of_range + self.filtered_out
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingCoordinate => self.missing_coordinate += 1,
            DropReason::UnparseableCoordinate => self.unparseable_coordinate += 1,
            DropReason::OutOfRange => self.out_of_range += 1,
            DropReason::FilteredOut => self.filtered_out += 1,
        }
    }
}

/// Coerce a raw coordinate cell to decimal degrees. Only plain numbers are
/// accepted; anything else non-empty is unparseable.
pub(crate) fn coerce_coordinate(value: &RawValue) -> Result<f64, DropReason> {
    match value {
        RawValue::Null => Err(DropReason::MissingCoordinate),
        RawValue::Text(s) if s.trim().is_empty() => Err(DropReason::MissingCoordinate),
        other => other.as_f64().ok_or(DropReason::UnparseableCoordinate),
    }
}

/// Coerce and range-check a latitude/longitude pair.
pub(crate) fn coerce_position(latitude: &RawValue, longitude: &RawValue) -> Result<(f64, f64), DropReason> {
    let latitude = coerce_coordinate(latitude)?;
    let longitude = coerce_coordinate(longitude)?;

    if is_valid_latitude(latitude) && is_valid_longitude(longitude) {
        Ok((latitude, longitude))
    } else {
        Err(DropReason::OutOfRange)
    }
}

/// Turns raw occurrence rows into [`SubjectPoint`]s, dropping (never failing on)
/// rows without a usable position.
pub struct CoordinateValidator {
    latitude_field: String,
    longitude_field: String,
    attribute_fields: Vec<String>,
    natural_key_fields: Vec<String>,
    filter: Option<AttributeFilter>,
}

impl CoordinateValidator {
    pub fn new(fields: &SubjectFields) -> Self {
        Self {
            latitude_field: fields.latitude_field.clone(),
            longitude_field: fields.longitude_field.clone(),
            attribute_fields: fields.attribute_fields.clone(),
            natural_key_fields: fields.natural_key_fields.clone(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<AttributeFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Validate every row. Output order follows input order.
    pub fn validate(&self, rows: &[RawRow]) -> (Vec<SubjectPoint>, ValidationStats) {
        let mut stats = ValidationStats {
            rows_read: rows.len(),
            ..Default::default()
        };
        let mut points = Vec::with_capacity(rows.len());

        for row in rows {
            match self.validate_row(row) {
                Ok(point) => points.push(point),
                Err(reason) => stats.record(reason),
            }
        }
        stats.accepted = points.len();

        info!(
            accepted = stats.accepted,
            dropped = stats.dropped(),
            "Validated subject coordinates"
        );
        if stats.dropped() > 0 {
            warn!(
                "Dropped {} subject rows: {} missing, {} unparseable, {} out of range, {} filtered",
                stats.dropped(),
                stats.missing_coordinate,
                stats.unparseable_coordinate,
                stats.out_of_range,
                stats.filtered_out
            );
        }

        (points, stats)
    }

    fn validate_row(&self, row: &RawRow) -> Result<SubjectPoint, DropReason> {
        let (latitude, longitude) = coerce_position(
            row.value(&self.latitude_field),
            row.value(&self.longitude_field),
        )?;

        if let Some(filter) = &self.filter {
            if row.value(&filter.field).as_text().as_deref() != Some(filter.equals.as_str()) {
                return Err(DropReason::FilteredOut);
            }
        }

        let attributes = self.attributes_of(row);
        let point = SubjectPoint::try_new(latitude, longitude, attributes).map_err(|e| {
            debug!("Rejected subject row: {}", e);
            DropReason::OutOfRange
        })?;

        Ok(point.with_key_values(self.key_values_of(row)))
    }

    // Taken from the full row, before attribute narrowing.
    fn key_values_of(&self, row: &RawRow) -> RawRow {
        self.natural_key_fields
            .iter()
            .map(|field| (field.as_str(), row.value(field).clone()))
            .collect()
    }

    fn attributes_of(&self, row: &RawRow) -> RawRow {
        row.iter()
            .filter(|(name, _)| *name != self.latitude_field && *name != self.longitude_field)
            .filter(|(name, _)| {
                self.attribute_fields.is_empty() || self.attribute_fields.iter().any(|f| f.as_str() == *name)
            })
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(lat: RawValue, lon: RawValue) -> RawRow {
        [
            ("species", RawValue::from("Castor canadensis")),
            ("decimalLatitude", lat),
            ("decimalLongitude", lon),
            ("stateProvince", RawValue::from("California")),
        ]
        .into_iter()
        .collect()
    }

    fn validator() -> CoordinateValidator {
        CoordinateValidator::new(&SubjectFields::default())
    }

    #[test]
    fn test_valid_rows_become_points() {
        let rows = vec![
            row(RawValue::Number(38.0), RawValue::Number(-122.0)),
            row(RawValue::from(" 38.5 "), RawValue::from("-121.5")),
        ];
        let (points, stats) = validator().validate(&rows);

        assert_eq!(points.len(), 2);
        assert_eq!(stats.dropped(), 0);
        assert!((points[1].latitude - 38.5).abs() < 1e-9);

        let names: Vec<&str> = points[0].attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["species", "stateProvince"]);
    }

    #[test]
    fn test_invalid_rows_are_dropped_and_counted() {
        let rows = vec![
            row(RawValue::Null, RawValue::Number(-122.0)),
            row(RawValue::from("  "), RawValue::Number(-122.0)),
            row(RawValue::from("north"), RawValue::Number(-122.0)),
            row(RawValue::Number(f64::NAN), RawValue::Number(-122.0)),
            row(RawValue::Number(91.0), RawValue::Number(-122.0)),
            row(RawValue::Number(38.0), RawValue::Number(-190.0)),
            row(RawValue::Number(38.0), RawValue::Number(-122.0)),
        ];
        let (points, stats) = validator().validate(&rows);

        assert_eq!(points.len(), 1);
        assert_eq!(
            stats,
            ValidationStats {
                rows_read: 7,
                accepted: 1,
                missing_coordinate: 2,
                unparseable_coordinate: 2,
                out_of_range: 2,
                filtered_out: 0,
            }
        );
        assert!(points.len() <= rows.len());
    }

    #[test]
    fn test_sexagesimal_text_is_unparseable() {
        let rows = vec![
            row(RawValue::from("38:00:00"), RawValue::from("-122:00:00")),
            row(RawValue::from("38.0"), RawValue::from("-122:00:00")),
            row(RawValue::Bool(true), RawValue::Number(-122.0)),
        ];
        let (points, stats) = validator().validate(&rows);

        assert!(points.is_empty());
        assert_eq!(stats.unparseable_coordinate, 3);
    }

    #[test]
    fn test_attribute_filter() {
        let mut oregon = row(RawValue::Number(44.0), RawValue::Number(-122.0));
        oregon.insert("stateProvince", RawValue::from("Oregon"));
        let rows = vec![row(RawValue::Number(38.0), RawValue::Number(-122.0)), oregon];

        let filter = AttributeFilter {
            field: "stateProvince".to_string(),
            equals: "California".to_string(),
        };
        let (points, stats) = validator().with_filter(Some(filter)).validate(&rows);

        assert_eq!(points.len(), 1);
        assert_eq!(stats.filtered_out, 1);
    }

    #[test]
    fn test_attribute_field_selection() {
        let fields = SubjectFields {
            attribute_fields: vec!["species".to_string()],
            ..SubjectFields::default()
        };
        let rows = vec![row(RawValue::Number(38.0), RawValue::Number(-122.0))];
        let (points, _) = CoordinateValidator::new(&fields).validate(&rows);

        assert_eq!(points[0].attributes.len(), 1);
        assert!(points[0].attributes.get("species").is_some());
    }

    #[test]
    fn test_key_fields_survive_attribute_narrowing() {
        let fields = SubjectFields {
            attribute_fields: vec!["species".to_string()],
            ..SubjectFields::default()
        };
        let dated = |year: f64| {
            let mut r = row(RawValue::Number(38.0), RawValue::Number(-122.0));
            r.insert("year", RawValue::Number(year));
            r.insert("month", RawValue::Number(6.0));
            r.insert("day", RawValue::Number(14.0));
            r
        };
        let (points, _) = CoordinateValidator::new(&fields).validate(&[dated(2020.0), dated(2021.0)]);

        assert!(points[0].attributes.get("year").is_none());
        assert_eq!(points[0].key_text("year").as_deref(), Some("2020"));
        assert_eq!(points[1].key_text("year").as_deref(), Some("2021"));
    }
}
