use crate::error::{ProcessingError, Result};
use crate::models::{RawRow, RawValue};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            _ => Err(ProcessingError::InvalidFormat(format!(
                "Cannot infer input format of '{}' (expected .csv or .json)",
                path.display()
            ))),
        }
    }
}

/// Read a headed CSV into raw rows. Short records are padded with nulls.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(ProcessingError::InvalidFormat(
            "CSV input has no header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = RawRow::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            let value = record.get(index).map_or(RawValue::Null, RawValue::from_cell);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}
