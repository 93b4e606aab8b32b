//! Offline title classifier.
//!
//! Marks a title as a decision-maker when it contains a seniority marker
//! such as `chief`, `vp` or `head of`. Stands in for the LLM adapter when
//! running locally.

use std::time::Duration;

use crate::domain::errors::ClassificationError;
use crate::domain::models::{ClassificationKey, TitleVerdict};
use crate::domain::ports::TitleClassifier;

/// Whole-word markers.
const WORD_MARKERS: &[&str] = &[
    "ceo", "cto", "cfo", "coo", "cio", "ciso", "cmo", "cro", "cpo", "chief", "founder",
    "cofounder", "co-founder", "president", "vp", "svp", "evp", "avp", "director", "owner",
    "partner", "principal", "head",
];

/// Multi-word markers, matched as substrings.
const PHRASE_MARKERS: &[&str] = &["vice president", "managing director", "general manager", "head of"];

/// Markers that veto a match, e.g. "assistant to the ceo".
const VETO_MARKERS: &[&str] = &["assistant", "intern", "associate", "coordinator"];

/// Keyword-matching [`TitleClassifier`].
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    latency: Option<Duration>,
}

impl KeywordClassifier {
    pub const fn new() -> Self {
        Self { latency: None }
    }

    /// Sleep for `latency` on every call, to mimic a remote model.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn is_decision_maker(title: &str) -> bool {
        let words: Vec<&str> = title
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|w| !w.is_empty())
            .collect();

        if words.iter().any(|w| VETO_MARKERS.contains(w)) {
            return false;
        }
        words.iter().any(|w| WORD_MARKERS.contains(w))
            || PHRASE_MARKERS.iter().any(|phrase| title.contains(phrase))
    }
}

impl TitleClassifier for KeywordClassifier {
    fn classify(&self, key: &ClassificationKey) -> Result<TitleVerdict, ClassificationError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        Ok(TitleVerdict {
            is_decision_maker: Self::is_decision_maker(key.as_str()),
        })
    }
}
