use serde::{Deserialize, Serialize};
use validator::Validate;

/// A fixed monitoring location, keyed by its site identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationLocation {
    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl StationLocation {
    pub fn new(station_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            station_id: station_id.into(),
            latitude,
            longitude,
        }
    }

    pub fn same_position(&self, latitude: f64, longitude: f64) -> bool {
        self.latitude == latitude && self.longitude == longitude
    }
}
