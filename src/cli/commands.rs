use crate::cli::args::{Cli, Commands};
use crate::config::{AttributeFilter, PipelineConfig};
use crate::error::Result;
use crate::processors::JoinPipeline;
use crate::readers::{ConcurrentReader, ReadingReader};
use crate::utils::filename::{csv_sibling, generate_default_parquet_filename};
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, JoinedRecordRepository, ParquetRepository, ParquetWriter};
use tracing::{debug, info};
use validator::Validate;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    debug!("Verbose logging enabled");

    match cli.command {
        Commands::Join {
            subjects,
            readings,
            output_file,
            csv,
            config,
            compression,
            strategy,
            conflict_policy,
            max_workers,
            filter,
            report_json,
            validate_only,
        } => {
            let mut settings = PipelineConfig::load(config.as_deref())?;
            if let Some(compression) = compression {
                settings.compression = compression;
            }
            if let Some(strategy) = strategy {
                settings.match_strategy = strategy;
            }
            if let Some(policy) = conflict_policy {
                settings.conflict_policy = policy;
            }
            if let Some(workers) = max_workers {
                settings.max_workers = workers;
            }
            let filter = filter.as_deref().map(AttributeFilter::parse).transpose()?;
            let settings = settings.with_filter(filter);
            settings.validate()?;

            let output_file = output_file.unwrap_or_else(generate_default_parquet_filename);

            println!("Joining occurrences to nearest stations...");
            println!("Subjects: {}", subjects.display());
            println!("Readings: {}", readings.display());
            println!(
                "Strategy: {:?}, Workers: {}",
                settings.match_strategy, settings.max_workers
            );

            let progress = ProgressReporter::new_spinner("Reading source data...", cli.quiet);

            let reader = ConcurrentReader::new(settings.reading.clone());
            let sources = reader.read_sources(&subjects, &readings).await?;

            let pipeline = JoinPipeline::new(settings);
            let (records, report) = pipeline.run_sources(&sources, Some(&progress))?;

            progress.finish_with_message(&format!("Joined {} records", records.len()));
            println!("\n{}", report.generate_summary());

            if let Some(report_path) = &report_json {
                report.write_json(report_path)?;
                println!("Report written to {}", report_path.display());
            }

            if validate_only {
                println!("Validation complete - no output file written");
                return Ok(());
            }

            let settings = pipeline.config();
            let writer = ParquetWriter::new()
                .with_compression(&settings.compression)?
                .with_row_group_size(settings.row_group_size);
            let repository =
                ParquetRepository::new(&output_file, writer).with_batch_size(settings.chunk_size);

            println!("Writing {} records to {}...", records.len(), output_file.display());
            let outcome = repository.upsert(&records)?;
            println!(
                "Inserted {} new records, skipped {} already stored",
                outcome.inserted, outcome.skipped
            );

            if csv {
                let csv_path = csv_sibling(&output_file);
                let stored = repository.load_all()?;
                CsvWriter::new().write_records(&stored, &csv_path)?;
                println!("CSV export: {}", csv_path.display());
            }

            if output_file.exists() {
                let file_info = ParquetWriter::new().get_file_info(&output_file)?;
                println!("\n{}", file_info.summary());
            }

            info!(path = %output_file.display(), "Join run complete");
            println!("Processing complete!");
        }

        Commands::Stations { readings, config } => {
            let settings = PipelineConfig::load(config.as_deref())?;
            let reading_fields = settings.reading.clone();

            let rows = tokio::task::spawn_blocking(move || {
                ReadingReader::new(reading_fields).read_rows(&readings)
            })
            .await??;

            let summary = JoinPipeline::new(settings).station_summary(&rows);

            println!("{} stations:", summary.len());
            for (i, entry) in summary.iter().enumerate() {
                let metric = match &entry.aggregate {
                    Some(aggregate) => format!(
                        "mean={:.3} (n={})",
                        aggregate.metric_value, aggregate.sample_count
                    ),
                    None => "no readings".to_string(),
                };
                println!(
                    "{}. {} ({:.4}, {:.4}) {}",
                    i + 1,
                    entry.station.station_id,
                    entry.station.latitude,
                    entry.station.longitude,
                    metric
                );
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;

            println!("\nFile Details:");
            println!("{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing {} records):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            let metric = record
                                .metric_value
                                .map(|v| format!("{:.3}", v))
                                .unwrap_or_else(|| "n/a".to_string());
                            println!(
                                "{}. ({:.4}, {:.4}) -> {} at {:.3} km, metric={} {}",
                                i + 1,
                                record.latitude,
                                record.longitude,
                                record.nearest_station_id,
                                record.distance_km,
                                metric,
                                record.attributes.to_json_string()
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}
