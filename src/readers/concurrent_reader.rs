use crate::config::ReadingFields;
use crate::error::Result;
use crate::models::RawRow;
use crate::readers::{ReadingReader, SubjectReader};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::info;

/// Both raw inputs, fully materialised.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub subject_rows: Vec<RawRow>,
    pub reading_rows: Vec<RawRow>,
}

pub struct ConcurrentReader {
    reading_fields: ReadingFields,
}

impl ConcurrentReader {
    pub fn new(reading_fields: ReadingFields) -> Self {
        Self { reading_fields }
    }

    /// Read the subject and reading files concurrently on the blocking pool
    pub async fn read_sources(&self, subjects_path: &Path, readings_path: &Path) -> Result<SourceData> {
        let subjects_path: PathBuf = subjects_path.to_path_buf();
        let readings_path: PathBuf = readings_path.to_path_buf();
        let reading_fields = self.reading_fields.clone();

        let subject_handle: JoinHandle<Result<Vec<RawRow>>> =
            tokio::task::spawn_blocking(move || SubjectReader::new().read_rows(&subjects_path));

        let reading_handle: JoinHandle<Result<Vec<RawRow>>> = tokio::task::spawn_blocking(move || {
            ReadingReader::new(reading_fields).read_rows(&readings_path)
        });

        let (subject_rows, reading_rows) = tokio::try_join!(subject_handle, reading_handle)?;
        let data = SourceData {
            subject_rows: subject_rows?,
            reading_rows: reading_rows?,
        };

        info!(
            subject_rows = data.subject_rows.len(),
            reading_rows = data.reading_rows.len(),
            "Loaded source data"
        );

        Ok(data)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(ReadingFields::default())
    }
}
