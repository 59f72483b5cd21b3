pub mod csv_writer;
pub mod parquet_writer;
pub mod repository;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
pub use repository::{JoinedRecordRepository, ParquetRepository, UpsertOutcome};
