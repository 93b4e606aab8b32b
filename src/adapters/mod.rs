//! Adapters for the ports the aggregation core consumes.

pub mod clock;
pub mod json_file_source;
pub mod keyword_classifier;

pub use clock::ManualClock;
pub use json_file_source::JsonFileRecordSource;
pub use keyword_classifier::KeywordClassifier;
