pub mod config;
pub mod stakeholder;

pub use config::{
    CacheConfig, Config, DataSourceConfig, FailurePolicy, FanOutConfig, LogFormat, LoggingConfig,
    RotationPolicy,
};
pub use stakeholder::{
    normalize_text, AggregationResponse, AggregationSummary, ClassificationKey,
    ClassificationResult, ClassifiedStakeholder, RawRecord, RecordProjection, StakeholderRecord,
    StakeholderVerdict, TitleVerdict,
};
