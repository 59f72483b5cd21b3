use crate::error::{ProcessingError, Result};
use crate::models::{JoinedRecord, JoinedRecordBuilder, StationAggregate, SubjectPoint};
use crate::processors::nearest_matcher::StationMatch;
use crate::processors::station_deduplicator::StationTable;
use std::collections::BTreeMap;
use tracing::debug;

/// Left-joins matched subject points with their station's aggregate.
pub struct JoinAssembler {
    natural_key_fields: Vec<String>,
}

impl JoinAssembler {
    pub fn new(natural_key_fields: Vec<String>) -> Self {
        Self { natural_key_fields }
    }

    /// One record per subject, in subject order. Stations without an
    /// aggregate yield `metric_value: None`.
    pub fn assemble(
        &self,
        subjects: &[SubjectPoint],
        matches: &[StationMatch],
        stations: &StationTable,
        aggregates: &BTreeMap<String, StationAggregate>,
    ) -> Result<Vec<JoinedRecord>> {
        if subjects.len() != matches.len() {
            return Err(ProcessingError::DataMerge(format!(
                "{} subject points but {} station matches",
                subjects.len(),
                matches.len()
            )));
        }

        let records = subjects
            .iter()
            .zip(matches)
            .map(|(subject, found)| {
                let station = stations.get_by_index(found.station_index).ok_or_else(|| {
                    ProcessingError::DataMerge(format!(
                        "Station index {} outside table of {}",
                        found.station_index,
                        stations.len()
                    ))
                })?;

                JoinedRecordBuilder::new()
                    .subject(subject)
                    .station(station.station_id.clone(), station.latitude, station.longitude)
                    .distance_km(found.distance_km)
                    .metric_value(aggregates.get(&station.station_id).map(|a| a.metric_value))
                    .natural_key(JoinedRecord::natural_key_for(subject, &self.natural_key_fields))
                    .build()
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Assembled {} joined records", records.len());
        Ok(records)
    }
}
