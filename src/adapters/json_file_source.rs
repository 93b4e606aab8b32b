//! File-backed record source.
//!
//! Reads a JSON document mapping aggregation ids to arrays of attendee
//! records:
//!
//! ```json
//! {
//!   "Deal-A": [
//!     { "email": "ada@acme.io", "name": "Ada", "title": "VP Engineering" }
//!   ]
//! }
//! ```
//!
//! The file is re-read on every fetch so edits are picked up without a restart.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::errors::FetchError;
use crate::domain::models::{normalize_text, RawRecord, RecordProjection};
use crate::domain::ports::RecordSource;

/// [`RecordSource`] over a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileRecordSource {
    path: PathBuf,
}

impl JsonFileRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, FetchError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            FetchError::Unavailable(format!("{}: {err}", self.path.display()))
        })?;
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(FetchError::Malformed(format!(
                "{}: top level must be an object keyed by aggregation id",
                self.path.display()
            ))),
            Err(err) => Err(FetchError::Malformed(format!("{}: {err}", self.path.display()))),
        }
    }
}

#[async_trait]
impl RecordSource for JsonFileRecordSource {
    async fn fetch_projected_records(
        &self,
        aggregation_id: &str,
        projection: &RecordProjection,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let document = self.load().await?;

        let wanted = normalize_text(aggregation_id);
        let entry = document.get(aggregation_id).or_else(|| {
            document
                .iter()
                .find(|(id, _)| normalize_text(id) == wanted)
                .map(|(_, records)| records)
        });

        let Some(entry) = entry else {
            debug!(aggregation_id, "no records for aggregation");
            return Ok(Vec::new());
        };
        let Value::Array(items) = entry else {
            return Err(FetchError::Malformed(format!(
                "records for '{aggregation_id}' must be an array"
            )));
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| project(item, projection).map_err(|reason| {
                FetchError::Malformed(format!("record {index} of '{aggregation_id}': {reason}"))
            }))
            .collect()
    }
}

/// Keep only projected fields and decode the result.
fn project(item: &Value, projection: &RecordProjection) -> Result<RawRecord, String> {
    let Value::Object(fields) = item else {
        return Err("expected an object".to_string());
    };
    let projected: Map<String, Value> = fields
        .iter()
        .filter(|(field, _)| projection.includes(field))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    serde_json::from_value(Value::Object(projected)).map_err(|err| err.to_string())
}
