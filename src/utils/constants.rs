/// Mean Earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic bounds
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Two candidate stations closer than this (km) count as equidistant
pub const DEFAULT_TIE_TOLERANCE_KM: f64 = 1e-9;

/// Subject field names (GBIF occurrence search)
pub const DEFAULT_SUBJECT_LAT_FIELD: &str = "decimalLatitude";
pub const DEFAULT_SUBJECT_LON_FIELD: &str = "decimalLongitude";
pub const DEFAULT_NATURAL_KEY_FIELDS: [&str; 3] = ["year", "month", "day"];

/// Reading field names (flattened USGS instantaneous values)
pub const DEFAULT_STATION_ID_FIELD: &str = "site_name";
pub const DEFAULT_STATION_LAT_FIELD: &str = "latitude";
pub const DEFAULT_STATION_LON_FIELD: &str = "longitude";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "datetime";
pub const DEFAULT_VALUE_FIELD: &str = "dissolved_oxygen";

/// Environment prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "WATERSHED";

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
