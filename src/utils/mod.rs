pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::haversine_distance;
pub use filename::{csv_sibling, generate_default_parquet_filename};
pub use logging::init_logging;
pub use progress::ProgressReporter;
