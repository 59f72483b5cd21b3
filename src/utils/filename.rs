use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Generate default joined output filename with format: watershed-joined-{YYMMDD}.parquet
pub fn generate_default_parquet_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("watershed-joined-{:02}{:02}{:02}.parquet", year, month, day);
    PathBuf::from("output").join(filename)
}

/// Sibling CSV path for a Parquet output (`joined.parquet` -> `joined.csv`)
pub fn csv_sibling(parquet_path: &Path) -> PathBuf {
    parquet_path.with_extension("csv")
}
