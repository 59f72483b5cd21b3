use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate format: {0}")]
    InvalidCoordinate(String),

    #[error("Data merge error: {0}")]
    DataMerge(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("No monitoring stations available to match {subjects} subject points against")]
    NoStationsAvailable { subjects: usize },

    #[error("No valid subject points available ({dropped} of {read} rows dropped)")]
    NoSubjectsAvailable { read: usize, dropped: usize },

    #[error("Output write error: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Structural defects abort the run; everything else is an I/O or format problem.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ProcessingError::NoStationsAvailable { .. } | ProcessingError::NoSubjectsAvailable { .. }
        )
    }
}
