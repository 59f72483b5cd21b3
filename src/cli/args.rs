use crate::config::{ConflictPolicy, MatchStrategy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "watershed-join")]
#[command(about = "Join wildlife occurrences to their nearest water-quality station")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Hide progress spinners")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match occurrences to stations and persist the joined table
    Join {
        #[arg(short, long, help = "Occurrence file (CSV or GBIF JSON)")]
        subjects: PathBuf,

        #[arg(short, long, help = "Station readings file (CSV or USGS JSON)")]
        readings: PathBuf,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/watershed-joined-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Also export the joined table as CSV next to the Parquet file")]
        csv: bool,

        #[arg(long, help = "Configuration file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Parquet compression [default: snappy]")]
        compression: Option<String>,

        #[arg(long, value_enum)]
        strategy: Option<MatchStrategy>,

        #[arg(long, value_enum)]
        conflict_policy: Option<ConflictPolicy>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Keep only occurrences where field=value")]
        filter: Option<String>,

        #[arg(long, help = "Write the run report as JSON to this path")]
        report_json: Option<PathBuf>,

        #[arg(long, default_value = "false", help = "Run the join and report without writing output")]
        validate_only: bool,
    },

    /// List deduplicated stations with their mean reading
    Stations {
        #[arg(short, long, help = "Station readings file (CSV or USGS JSON)")]
        readings: PathBuf,

        #[arg(long, help = "Configuration file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,
    },

    /// Display information about a joined Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_join() {
        let cli = Cli::parse_from([
            "watershed-join",
            "join",
            "--subjects",
            "beavers.json",
            "--readings",
            "usgs.json",
            "--strategy",
            "sequential",
            "--conflict-policy",
            "last-seen",
            "--filter",
            "stateProvince=California",
            "--report-json",
            "report.json",
        ]);

        match cli.command {
            Commands::Join {
                strategy,
                conflict_policy,
                filter,
                csv,
                report_json,
                ..
            } => {
                assert_eq!(strategy, Some(MatchStrategy::Sequential));
                assert_eq!(conflict_policy, Some(ConflictPolicy::LastSeen));
                assert_eq!(filter.as_deref(), Some("stateProvince=California"));
                assert!(!csv);
                assert_eq!(report_json, Some(PathBuf::from("report.json")));
            }
            _ => panic!("expected join command"),
        }
    }
}
