//! Pipeline configuration.
//!
//! Values are layered with the `config` crate: built-in defaults, then an
//! optional file (TOML/JSON/YAML, picked by extension), then environment
//! variables prefixed `WATERSHED_` (nested keys separated by `__`, e.g.
//! `WATERSHED_SUBJECT__LATITUDE_FIELD`). Command-line flags are applied last
//! by the CLI.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::*;

/// Which coordinates survive when one station id appears at several positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    FirstSeen,
    LastSeen,
}

/// How the nearest-station search is executed. Both produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Sequential,
    #[default]
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SubjectFields {
    #[validate(length(min = 1))]
    pub latitude_field: String,

    #[validate(length(min = 1))]
    pub longitude_field: String,

    /// Attribute fields appended to the coordinates to form the natural key
    pub natural_key_fields: Vec<String>,

    /// Attributes carried into the joined output; empty keeps every field
    pub attribute_fields: Vec<String>,
}

impl Default for SubjectFields {
    fn default() -> Self {
        Self {
            latitude_field: DEFAULT_SUBJECT_LAT_FIELD.to_string(),
            longitude_field: DEFAULT_SUBJECT_LON_FIELD.to_string(),
            natural_key_fields: DEFAULT_NATURAL_KEY_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            attribute_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReadingFields {
    #[validate(length(min = 1))]
    pub station_id_field: String,

    #[validate(length(min = 1))]
    pub latitude_field: String,

    #[validate(length(min = 1))]
    pub longitude_field: String,

    #[validate(length(min = 1))]
    pub timestamp_field: String,

    #[validate(length(min = 1))]
    pub value_field: String,
}

impl Default for ReadingFields {
    fn default() -> Self {
        Self {
            station_id_field: DEFAULT_STATION_ID_FIELD.to_string(),
            latitude_field: DEFAULT_STATION_LAT_FIELD.to_string(),
            longitude_field: DEFAULT_STATION_LON_FIELD.to_string(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
        }
    }
}

/// Keep only subjects whose `field` renders exactly as `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AttributeFilter {
    #[validate(length(min = 1))]
    pub field: String,
    pub equals: String,
}

impl AttributeFilter {
    /// Parse `field=value`.
    pub fn parse(expr: &str) -> Result<Self> {
        let (field, equals) = expr.split_once('=').ok_or_else(|| {
            ProcessingError::Config(format!("Filter '{}' must look like field=value", expr))
        })?;

        let filter = Self {
            field: field.trim().to_string(),
            equals: equals.trim().to_string(),
        };
        filter.validate()?;
        Ok(filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(nested)]
    pub subject: SubjectFields,

    #[validate(nested)]
    pub reading: ReadingFields,

    pub conflict_policy: ConflictPolicy,

    pub match_strategy: MatchStrategy,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub tie_tolerance_km: f64,

    #[validate(nested)]
    pub filter: Option<AttributeFilter>,

    #[validate(range(min = 1))]
    pub chunk_size: usize,

    #[validate(custom(function = "validate_compression"))]
    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            subject: SubjectFields::default(),
            reading: ReadingFields::default(),
            conflict_policy: ConflictPolicy::default(),
            match_strategy: MatchStrategy::default(),
            max_workers: num_cpus::get(),
            tie_tolerance_km: DEFAULT_TIE_TOLERANCE_KM,
            filter: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

fn validate_compression(compression: &str) -> std::result::Result<(), ValidationError> {
    match compression.to_lowercase().as_str() {
        COMPRESSION_SNAPPY | COMPRESSION_GZIP | COMPRESSION_LZ4 | COMPRESSION_ZSTD
        | COMPRESSION_NONE => Ok(()),
        _ => Err(ValidationError::new("unsupported_compression")),
    }
}

impl PipelineConfig {
    /// Load defaults, then `path` (if any), then `WATERSHED_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_filter(mut self, filter: Option<AttributeFilter>) -> Self {
        if filter.is_some() {
            self.filter = filter;
        }
        self
    }
}
