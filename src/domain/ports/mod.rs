//! Port trait definitions (Hexagonal Architecture)
//!
//! Contracts for the collaborators the aggregation core consumes:
//! - RecordSource: projected raw records per aggregation id
//! - TitleClassifier: blocking, possibly slow, decision-maker classification
//! - Clock: wall-clock time for cache expiry and result stamping, with the
//!   `SystemClock` default

pub mod classifier;
pub mod clock;
pub mod record_source;

pub use classifier::TitleClassifier;
pub use clock::{Clock, SystemClock};
pub use record_source::RecordSource;
