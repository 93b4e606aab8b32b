use crate::domain::errors::ClassificationError;
use crate::domain::models::{ClassificationKey, TitleVerdict};

/// Classification adapter for normalized job titles.
///
/// Calls are synchronous and may block for seconds (an LLM round trip is
/// typical). Implementations must be safe to call from many threads at once;
/// callers offload every call to a blocking pool and bound how many run
/// concurrently.
pub trait TitleClassifier: Send + Sync {
    /// Decide whether `key` denotes a decision-maker.
    fn classify(&self, key: &ClassificationKey) -> Result<TitleVerdict, ClassificationError>;
}
