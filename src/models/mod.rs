pub mod joined;
pub mod raw;
pub mod reading;
pub mod station;
pub mod subject;

pub use joined::{JoinedRecord, JoinedRecordBuilder};
pub use raw::{RawRow, RawValue};
pub use reading::{Reading, StationAggregate};
pub use station::StationLocation;
pub use subject::SubjectPoint;
