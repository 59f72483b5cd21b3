use crate::error::Result;
use crate::models::JoinedRecord;
use crate::writers::ParquetWriter;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Persistent store of joined records keyed by their natural key.
pub trait JoinedRecordRepository {
    /// Insert records, skipping any whose natural key is already stored.
    /// The whole batch is applied or none of it is.
    fn upsert(&self, records: &[JoinedRecord]) -> Result<UpsertOutcome>;

    fn load_all(&self) -> Result<Vec<JoinedRecord>>;
}

/// Single-file Parquet store. Every upsert rewrites the file through a
/// temporary sibling that is renamed over the target.
pub struct ParquetRepository {
    path: PathBuf,
    writer: ParquetWriter,
    batch_size: usize,
}

impl ParquetRepository {
    pub fn new(path: impl Into<PathBuf>, writer: ParquetWriter) -> Self {
        Self {
            path: path.into(),
            writer,
            batch_size: crate::utils::constants::DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fill a temporary sibling with `write` and rename it over the target.
    /// If `write` fails the temporary file is dropped and the target is untouched.
    fn replace_with<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> Result<()>,
    {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        write(temp.as_file_mut())?;
        temp.persist(&self.path)?;
        Ok(())
    }

    fn replace_file(&self, records: &[JoinedRecord]) -> Result<()> {
        self.replace_with(|file| self.writer.write_to(records, file, self.batch_size))?;

        debug!("Replaced {} with {} records", self.path.display(), records.len());
        Ok(())
    }
}

impl JoinedRecordRepository for ParquetRepository {
    fn upsert(&self, records: &[JoinedRecord]) -> Result<UpsertOutcome> {
        for record in records {
            record.validate()?;
        }

        let mut stored = self.load_all()?;
        let mut keys: HashSet<String> = stored.iter().map(|r| r.natural_key.clone()).collect();

        let mut outcome = UpsertOutcome::default();
        for record in records {
            if keys.insert(record.natural_key.clone()) {
                stored.push(record.clone());
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        if outcome.inserted > 0 {
            self.replace_file(&stored)?;
        }

        info!(
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            path = %self.path.display(),
            "Persisted joined records"
        );
        Ok(outcome)
    }

    fn load_all(&self) -> Result<Vec<JoinedRecord>> {
        if self.path.exists() {
            self.writer.read_records(&self.path)
        } else {
            Ok(Vec::new())
        }
    }
}
