use crate::config::{MatchStrategy, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{StationLocation, SubjectPoint};
use crate::processors::station_deduplicator::StationTable;
use crate::utils::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_TIE_TOLERANCE_KM};
use crate::utils::coordinates::haversine_distance;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// The closest station for one subject point, as an index into the station table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationMatch {
    pub station_index: usize,
    pub distance_km: f64,
}

/// Brute-force nearest-station search, run sequentially or sharded over
/// subject points with rayon. Both strategies return identical results.
pub struct NearestMatcher {
    strategy: MatchStrategy,
    max_workers: usize,
    tie_tolerance_km: f64,
    chunk_size: usize,
}

impl NearestMatcher {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self {
            strategy,
            max_workers: num_cpus::get(),
            tie_tolerance_km: DEFAULT_TIE_TOLERANCE_KM,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.match_strategy)
            .with_max_workers(config.max_workers)
            .with_tie_tolerance(config.tie_tolerance_km)
            .with_chunk_size(config.chunk_size)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_tie_tolerance(mut self, tie_tolerance_km: f64) -> Self {
        self.tie_tolerance_km = tie_tolerance_km;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Match every subject, in input order.
    pub fn match_all(
        &self,
        subjects: &[SubjectPoint],
        stations: &StationTable,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<StationMatch>> {
        if stations.is_empty() {
            return Err(ProcessingError::NoStationsAvailable {
                subjects: subjects.len(),
            });
        }

        if let Some(p) = progress {
            p.start_stage(
                &format!("Matching {} points against {} stations...", subjects.len(), stations.len()),
                subjects.len() as u64,
            );
        }

        let stations = stations.as_slice();
        let matches = match self.strategy {
            MatchStrategy::Sequential => {
                let mut matches = Vec::with_capacity(subjects.len());
                for (done, subject) in subjects.iter().enumerate() {
                    matches.push(self.nearest(subject, stations));
                    if let Some(p) = progress {
                        if (done + 1) % self.chunk_size == 0 {
                            p.update((done + 1) as u64);
                        }
                    }
                }
                matches
            }
            MatchStrategy::Parallel => self.match_parallel(subjects, stations, progress)?,
        };

        if let Some(p) = progress {
            p.update(subjects.len() as u64);
        }

        info!(
            subjects = subjects.len(),
            stations = stations.len(),
            strategy = ?self.strategy,
            "Matched subjects to nearest stations"
        );

        Ok(matches)
    }

    fn match_parallel(
        &self,
        subjects: &[SubjectPoint],
        stations: &[StationLocation],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<StationMatch>> {
        let processed = AtomicUsize::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        debug!(
            "Matching in chunks of {} on {} threads",
            self.chunk_size, self.max_workers
        );

        // Chunks are indexed, so collecting keeps subject order.
        let chunks: Vec<Vec<StationMatch>> = pool.install(|| {
            subjects
                .par_chunks(self.chunk_size)
                .map(|chunk| {
                    let matches: Vec<StationMatch> =
                        chunk.iter().map(|s| self.nearest(s, stations)).collect();

                    let count = processed.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    matches
                })
                .collect()
        });

        Ok(chunks.into_iter().flatten().collect())
    }

    /// Linear scan. A later station only wins when it is closer by more than
    /// the tie tolerance, so ties go to the earliest station in table order.
    fn nearest(&self, subject: &SubjectPoint, stations: &[StationLocation]) -> StationMatch {
        let mut best = StationMatch {
            station_index: 0,
            distance_km: f64::INFINITY,
        };

        for (index, station) in stations.iter().enumerate() {
            let distance = haversine_distance(
                subject.latitude,
                subject.longitude,
                station.latitude,
                station.longitude,
            );
            if distance < best.distance_km - self.tie_tolerance_km {
                best = StationMatch {
                    station_index: index,
                    distance_km: distance,
                };
            }
        }

        best
    }
}

impl Default for NearestMatcher {
    fn default() -> Self {
        Self::new(MatchStrategy::default())
    }
}
