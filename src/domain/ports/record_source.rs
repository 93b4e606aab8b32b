use async_trait::async_trait;

use crate::domain::errors::FetchError;
use crate::domain::models::{RawRecord, RecordProjection};

/// Supplies raw attendee records for one aggregation.
///
/// Implementations should return only the fields named in `projection`;
/// anything beyond the typed identity/title fields lands in
/// `RawRecord::attributes`. An unknown aggregation id yields an empty list,
/// not an error.
///
/// `aggregation_id` arrives trimmed and otherwise exactly as the caller gave
/// it. The request cache is keyed on that same string, so a source that
/// treats two spellings as one deal still has them cached separately.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_projected_records(
        &self,
        aggregation_id: &str,
        projection: &RecordProjection,
    ) -> Result<Vec<RawRecord>, FetchError>;
}
