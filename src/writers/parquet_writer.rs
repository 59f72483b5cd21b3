use crate::error::{ProcessingError, Result};
use crate::models::{JoinedRecord, RawRow};
use crate::utils::constants::*;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write joined records to a Parquet file
    pub fn write_records(&self, records: &[JoinedRecord], path: &Path) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let file = File::create(path)?;
        self.write_to(records, file, records.len())
    }

    /// Write records to any sink, one record batch per `batch_size` records.
    /// An empty slice still produces a valid file with the schema.
    pub fn write_to<W: Write + Send>(&self, records: &[JoinedRecord], sink: W, batch_size: usize) -> Result<()> {
        let schema = Self::schema();
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(sink, schema.clone(), Some(props))?;
        for chunk in records.chunks(batch_size.max(1)) {
            let batch = Self::records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        debug!("Wrote {} joined records", records.len());
        Ok(())
    }

    /// Arrow schema for joined records. Subject attributes are kept as one
    /// JSON object column since their fields vary between sources.
    pub fn schema() -> Arc<Schema> {
        let fields = vec![
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("nearest_station_id", DataType::Utf8, false),
            Field::new("station_latitude", DataType::Float64, false),
            Field::new("station_longitude", DataType::Float64, false),
            Field::new("distance_km", DataType::Float64, false),
            Field::new("metric_value", DataType::Float64, true),
            Field::new("natural_key", DataType::Utf8, false),
            Field::new("attributes", DataType::Utf8, false),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(records: &[JoinedRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let latitudes: Vec<f64> = records.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<f64> = records.iter().map(|r| r.longitude).collect();
        let station_ids: Vec<&str> = records.iter().map(|r| r.nearest_station_id.as_str()).collect();
        let station_latitudes: Vec<f64> = records.iter().map(|r| r.station_latitude).collect();
        let station_longitudes: Vec<f64> = records.iter().map(|r| r.station_longitude).collect();
        let distances: Vec<f64> = records.iter().map(|r| r.distance_km).collect();
        let metrics: Vec<Option<f64>> = records.iter().map(|r| r.metric_value).collect();
        let natural_keys: Vec<&str> = records.iter().map(|r| r.natural_key.as_str()).collect();
        let attributes: Vec<String> = records.iter().map(|r| r.attributes.to_json_string()).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(latitudes)) as ArrayRef,
                Arc::new(Float64Array::from(longitudes)),
                Arc::new(StringArray::from(station_ids)),
                Arc::new(Float64Array::from(station_latitudes)),
                Arc::new(Float64Array::from(station_longitudes)),
                Arc::new(Float64Array::from(distances)),
                Arc::new(Float64Array::from(metrics)),
                Arc::new(StringArray::from(natural_keys)),
                Arc::new(StringArray::from(attributes)),
            ],
        )?;

        Ok(batch)
    }

    /// Read every record back from a Parquet file
    pub fn read_records(&self, path: &Path) -> Result<Vec<JoinedRecord>> {
        self.read_sample_records(path, usize::MAX)
    }

    /// Read up to `limit` records from a Parquet file
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<JoinedRecord>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let latitudes = column::<Float64Array>(&batch, "latitude")?;
            let longitudes = column::<Float64Array>(&batch, "longitude")?;
            let station_ids = column::<StringArray>(&batch, "nearest_station_id")?;
            let station_latitudes = column::<Float64Array>(&batch, "station_latitude")?;
            let station_longitudes = column::<Float64Array>(&batch, "station_longitude")?;
            let distances = column::<Float64Array>(&batch, "distance_km")?;
            let metrics = column::<Float64Array>(&batch, "metric_value")?;
            let natural_keys = column::<StringArray>(&batch, "natural_key")?;
            let attributes = column::<StringArray>(&batch, "attributes")?;

            let to_read = batch.num_rows().min(limit - records.len());
            for i in 0..to_read {
                let attributes: RawRow = serde_json::from_str(attributes.value(i))?;
                records.push(JoinedRecord {
                    attributes,
                    latitude: latitudes.value(i),
                    longitude: longitudes.value(i),
                    nearest_station_id: station_ids.value(i).to_string(),
                    station_latitude: station_latitudes.value(i),
                    station_longitude: station_longitudes.value(i),
                    distance_km: distances.value(i),
                    metric_value: (!metrics.is_null(i)).then(|| metrics.value(i)),
                    natural_key: natural_keys.value(i).to_string(),
                });
            }

            if records.len() >= limit {
                break;
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        // Codec of the first column chunk; files written here use one codec throughout.
        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
        })
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing or invalid {} column", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}
