//! Stakeholder records, classification keys and aggregation responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lower-case a string and collapse every whitespace run to a single space.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A raw attendee record as supplied by a record source.
///
/// Only the identity and title fields are typed; anything else the source
/// projected is kept verbatim in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl RawRecord {
    /// Deduplication identity for this record.
    ///
    /// Email wins when present; otherwise `name|company`. Returns `None` when
    /// the record carries neither an email nor a name.
    pub fn identity(&self) -> Option<String> {
        if let Some(email) = non_blank(self.email.as_deref()) {
            return Some(email.trim().to_lowercase());
        }
        let name = non_blank(self.name.as_deref())?;
        let company = non_blank(self.company.as_deref()).map(normalize_text);
        Some(format!(
            "{}|{}",
            normalize_text(name),
            company.unwrap_or_default()
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fields a record source must return for stakeholder extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordProjection {
    pub fields: Vec<String>,
}

impl RecordProjection {
    /// Identity and title fields only.
    pub fn stakeholder() -> Self {
        Self {
            fields: ["email", "name", "company", "title"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Add an extra attribute to the projection.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn includes(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

impl Default for RecordProjection {
    fn default() -> Self {
        Self::stakeholder()
    }
}

/// A deduplicated stakeholder. At most one per identity within a single aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderRecord {
    pub identity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl StakeholderRecord {
    /// Build a stakeholder from a raw record under an already derived identity.
    pub fn from_raw(identity: String, raw: RawRecord) -> Self {
        Self {
            identity,
            name: raw.name,
            email: raw.email,
            company: raw.company,
            title: raw.title,
            attributes: raw.attributes,
        }
    }

    /// Classification key derived from the title, if the title is not blank.
    pub fn classification_key(&self) -> Option<ClassificationKey> {
        self.title.as_deref().and_then(ClassificationKey::from_title)
    }
}

/// Normalized job title. Unit of work deduplication and the item-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationKey(String);

impl ClassificationKey {
    /// Normalize a title. Returns `None` for blank titles.
    pub fn from_title(title: &str) -> Option<Self> {
        let normalized = normalize_text(title);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a classifier answers for one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleVerdict {
    pub is_decision_maker: bool,
}

/// Outcome of classifying one key. Shared by every stakeholder with that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub key: ClassificationKey,
    pub is_decision_maker: bool,
    pub computed_at: DateTime<Utc>,
}

/// Classification state attached to one stakeholder in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StakeholderVerdict {
    /// The key resolved, from cache or from a fresh call.
    Classified { result: ClassificationResult },
    /// The classifier failed for this key and the policy tolerated it.
    Unresolved { key: ClassificationKey, error: String },
    /// No title, nothing to classify.
    Untitled,
}

impl StakeholderVerdict {
    pub fn is_decision_maker(&self) -> bool {
        matches!(self, Self::Classified { result } if result.is_decision_maker)
    }
}

/// A stakeholder together with its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedStakeholder {
    pub stakeholder: StakeholderRecord,
    pub verdict: StakeholderVerdict,
}

/// Headline counts for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub total_stakeholders: usize,
    pub decision_makers: usize,
    pub unresolved: usize,
    pub skipped_records: usize,
}

/// Full result of one aggregation; the unit stored in the request cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResponse {
    pub request_key: String,
    pub aggregation_id: String,
    pub generated_at: DateTime<Utc>,
    /// In first-encountered order.
    pub stakeholders: Vec<ClassifiedStakeholder>,
    pub summary: AggregationSummary,
}

impl AggregationResponse {
    /// Assemble a response and compute its summary.
    pub fn new(
        request_key: String,
        aggregation_id: String,
        generated_at: DateTime<Utc>,
        stakeholders: Vec<ClassifiedStakeholder>,
        skipped_records: usize,
    ) -> Self {
        let summary = AggregationSummary {
            total_stakeholders: stakeholders.len(),
            decision_makers: stakeholders
                .iter()
                .filter(|s| s.verdict.is_decision_maker())
                .count(),
            unresolved: stakeholders
                .iter()
                .filter(|s| matches!(s.verdict, StakeholderVerdict::Unresolved { .. }))
                .count(),
            skipped_records,
        };
        Self {
            request_key,
            aggregation_id,
            generated_at,
            stakeholders,
            summary,
        }
    }

    /// True when every titled stakeholder resolved.
    pub fn is_complete(&self) -> bool {
        self.summary.unresolved == 0
    }
}
