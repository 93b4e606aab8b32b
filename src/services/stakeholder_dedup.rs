//! Stakeholder deduplication.
//!
//! Collapses raw records to one stakeholder per identity and collects the
//! distinct classification keys those stakeholders need.

use std::collections::{HashMap, HashSet};

use crate::domain::models::{ClassificationKey, RawRecord, StakeholderRecord};

/// Output of [`deduplicate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// One per identity, in first-encountered order.
    pub stakeholders: Vec<StakeholderRecord>,
    /// Distinct keys, in the order their first stakeholder appears.
    pub keys: Vec<ClassificationKey>,
    /// Records with neither an email nor a name.
    pub skipped_records: usize,
}

/// Deduplicate raw records by identity.
///
/// The first record for an identity fixes its position. Later duplicates only
/// fill gaps: a missing title, name, email or company, and attribute keys the
/// first record lacked.
pub fn deduplicate(records: Vec<RawRecord>) -> DedupOutcome {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut stakeholders: Vec<StakeholderRecord> = Vec::with_capacity(records.len());
    let mut skipped_records = 0;

    for record in records {
        let Some(identity) = record.identity() else {
            skipped_records += 1;
            continue;
        };

        if let Some(&index) = positions.get(&identity) {
            merge_duplicate(&mut stakeholders[index], record);
        } else {
            positions.insert(identity.clone(), stakeholders.len());
            stakeholders.push(StakeholderRecord::from_raw(identity, record));
        }
    }

    let mut seen = HashSet::new();
    let keys = stakeholders
        .iter()
        .filter_map(StakeholderRecord::classification_key)
        .filter(|key| seen.insert(key.clone()))
        .collect();

    DedupOutcome {
        stakeholders,
        keys,
        skipped_records,
    }
}

fn merge_duplicate(existing: &mut StakeholderRecord, duplicate: RawRecord) {
    fill_blank(&mut existing.title, duplicate.title);
    fill_blank(&mut existing.name, duplicate.name);
    fill_blank(&mut existing.email, duplicate.email);
    fill_blank(&mut existing.company, duplicate.company);
    for (field, value) in duplicate.attributes {
        existing.attributes.entry(field).or_insert(value);
    }
}

fn fill_blank(slot: &mut Option<String>, candidate: Option<String>) {
    let is_blank = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if is_blank {
        if let Some(candidate) = candidate.filter(|c| !c.trim().is_empty()) {
            *slot = Some(candidate);
        }
    }
}
