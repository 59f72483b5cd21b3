use crate::config::{ConflictPolicy, ReadingFields};
use crate::models::{RawRow, StationLocation};
use crate::processors::coordinate_validator::coerce_position;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Unique monitoring locations in a fixed order (sorted by station id).
///
/// The order is part of the matching contract: ties go to the station that
/// comes first here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationTable {
    stations: Vec<StationLocation>,
}

impl StationTable {
    /// Build a table from locations. Duplicate ids keep their first occurrence.
    pub fn from_locations<I: IntoIterator<Item = StationLocation>>(locations: I) -> Self {
        let mut unique: BTreeMap<String, StationLocation> = BTreeMap::new();
        for location in locations {
            unique.entry(location.station_id.clone()).or_insert(location);
        }
        Self {
            stations: unique.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn as_slice(&self) -> &[StationLocation] {
        &self.stations
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationLocation> {
        self.stations.iter()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&StationLocation> {
        self.stations.get(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduplicationStats {
    pub rows_read: usize,
    pub stations: usize,
    pub missing_station_id: usize,
    pub invalid_coordinates: usize,
    /// Rows whose position disagreed with the one already recorded for their id
    pub conflicting_rows: usize,
    pub conflicting_stations: usize,
}

/// Collapses reading rows into one location per station id.
pub struct StationDeduplicator {
    fields: ReadingFields,
    policy: ConflictPolicy,
}

impl StationDeduplicator {
    pub fn new(fields: ReadingFields) -> Self {
        Self {
            fields,
            policy: ConflictPolicy::FirstSeen,
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn deduplicate(&self, rows: &[RawRow]) -> (StationTable, DeduplicationStats) {
        let mut stats = DeduplicationStats {
            rows_read: rows.len(),
            ..Default::default()
        };
        let mut stations: BTreeMap<String, StationLocation> = BTreeMap::new();
        let mut conflicted: BTreeSet<String> = BTreeSet::new();

        for row in rows {
            let Some(station_id) = row.value(&self.fields.station_id_field).as_text() else {
                stats.missing_station_id += 1;
                continue;
            };

            let Ok((latitude, longitude)) = coerce_position(
                row.value(&self.fields.latitude_field),
                row.value(&self.fields.longitude_field),
            ) else {
                stats.invalid_coordinates += 1;
                continue;
            };

            match stations.get_mut(&station_id) {
                None => {
                    stations.insert(
                        station_id.clone(),
                        StationLocation::new(station_id, latitude, longitude),
                    );
                }
                Some(existing) if existing.same_position(latitude, longitude) => {}
                Some(existing) => {
                    stats.conflicting_rows += 1;
                    if conflicted.insert(station_id.clone()) {
                        warn!(
                            "Station '{}' reported at ({}, {}) and ({}, {}); keeping the {} position",
                            station_id,
                            existing.latitude,
                            existing.longitude,
                            latitude,
                            longitude,
                            match self.policy {
                                ConflictPolicy::FirstSeen => "first",
                                ConflictPolicy::LastSeen => "last",
                            }
                        );
                    }
                    if self.policy == ConflictPolicy::LastSeen {
                        existing.latitude = latitude;
                        existing.longitude = longitude;
                    }
                }
            }
        }

        stats.stations = stations.len();
        stats.conflicting_stations = conflicted.len();

        info!(
            stations = stats.stations,
            conflicts = stats.conflicting_stations,
            "Deduplicated station locations"
        );

        let table = StationTable {
            stations: stations.into_values().collect(),
        };
        (table, stats)
    }
}
