pub mod concurrent_reader;
pub mod format;
pub mod reading_reader;
pub mod subject_reader;

pub use concurrent_reader::{ConcurrentReader, SourceData};
pub use format::InputFormat;
pub use reading_reader::ReadingReader;
pub use subject_reader::SubjectReader;
