//! Cache namespaces and key construction.
//!
//! Every cache key in the crate is built here. Keys carry their namespace
//! prefix so the request and item namespaces can never collide.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::models::{normalize_text, ClassificationKey};

/// The two logical caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// Whole aggregation responses, keyed by aggregation id.
    Request,
    /// Per-title classification results, keyed by classification key.
    Item,
}

impl CacheNamespace {
    pub const ALL: [Self; 2] = [Self::Request, Self::Item];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Item => "item",
        }
    }

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Request => "stakeholders:",
            Self::Item => "title:",
        }
    }

    /// Build the full key for a caller-supplied logical key in this namespace.
    ///
    /// Aggregation ids are only trimmed: the request key must name exactly the
    /// id the record source is queried with. Titles are normalized the way
    /// [`ClassificationKey`] normalizes them.
    pub fn key_for(self, logical: &str) -> String {
        match self {
            Self::Request => format!("{}{}", self.prefix(), logical.trim()),
            Self::Item => format!("{}{}", self.prefix(), normalize_text(logical)),
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheNamespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "request" | "requests" | "stakeholders" => Ok(Self::Request),
            "item" | "items" | "title" | "titles" => Ok(Self::Item),
            other => Err(format!(
                "Unknown cache namespace '{other}'. Must be one of: request, item"
            )),
        }
    }
}

/// Request-cache key for an aggregation id.
pub fn request_key(aggregation_id: &str) -> String {
    CacheNamespace::Request.key_for(aggregation_id)
}

/// Item-cache key for a classification key.
pub fn item_key(key: &ClassificationKey) -> String {
    format!("{}{}", CacheNamespace::Item.prefix(), key.as_str())
}
