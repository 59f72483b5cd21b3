pub mod coordinate_validator;
pub mod join_assembler;
pub mod join_pipeline;
pub mod join_report;
pub mod nearest_matcher;
pub mod station_aggregator;
pub mod station_deduplicator;

pub use coordinate_validator::{CoordinateValidator, DropReason, ValidationStats};
pub use join_assembler::JoinAssembler;
pub use join_pipeline::{JoinPipeline, StationSummary};
pub use join_report::{DistanceSummary, JoinReport};
pub use nearest_matcher::{NearestMatcher, StationMatch};
pub use station_aggregator::{AggregationStats, StationAggregator};
pub use station_deduplicator::{DeduplicationStats, StationDeduplicator, StationTable};
