use crate::error::Result;
use crate::models::RawRow;
use crate::readers::format::{read_csv_rows, InputFormat};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// GBIF occurrence search pages wrap records in `results`; exports are bare arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum OccurrenceDocument {
    Page { results: Vec<RawRow> },
    Rows(Vec<RawRow>),
}

/// Reads raw occurrence rows from CSV or GBIF-style JSON.
pub struct SubjectReader;

impl SubjectReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_rows(&self, path: &Path) -> Result<Vec<RawRow>> {
        let format = InputFormat::from_path(path)?;
        let file = BufReader::new(File::open(path)?);
        let rows = self.read_rows_from(file, format)?;

        debug!("Read {} subject rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn read_rows_from<R: Read>(&self, reader: R, format: InputFormat) -> Result<Vec<RawRow>> {
        match format {
            InputFormat::Csv => read_csv_rows(reader),
            InputFormat::Json => {
                let document: OccurrenceDocument = serde_json::from_reader(reader)?;
                Ok(match document {
                    OccurrenceDocument::Page { results } => results,
                    OccurrenceDocument::Rows(rows) => rows,
                })
            }
        }
    }
}

impl Default for SubjectReader {
    fn default() -> Self {
        Self::new()
    }
}
