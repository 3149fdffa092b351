//! Bundle assembly: turn one group's fetch outcomes into archive units.
//!
//! Empty results are dropped; a bundle with nothing left produces no unit.
//! A group whose fetch failed never reaches this stage (the fetch client
//! returns the error for the whole group), so a unit is always built from a
//! fully resolved bundle.

use anyhow::{ensure, Result};

use crate::fetch::FetchOutcome;
use crate::partition::{Bundle, BundleGroup, FetchKey};

/// One fetched, non-empty record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: FetchKey,
    /// Original JSON text as served.
    pub raw: Vec<u8>,
}

/// A bundle ready to be archived: its surviving records in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledBundle {
    pub bundle: Bundle,
    pub records: Vec<Record>,
}

impl AssembledBundle {
    /// Raw concatenation of every record's JSON, key-ordered, no delimiters.
    pub fn concatenated(&self) -> Vec<u8> {
        let len = self.records.iter().map(|r| r.raw.len()).sum();
        let mut out = Vec::with_capacity(len);
        for r in &self.records {
            out.extend_from_slice(&r.raw);
        }
        out
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Result of assembling one group.
#[derive(Debug, Default)]
pub struct AssembledGroup {
    /// Units to write, in bundle order.
    pub units: Vec<AssembledBundle>,
    /// Bundles where every key came back empty.
    pub empty: Vec<Bundle>,
}

/// Pair each bundle of `group` with its slice of `outcomes` (one per key, in
/// group key order) and drop empty results.
pub fn assemble_group(group: &BundleGroup, outcomes: Vec<FetchOutcome>) -> Result<AssembledGroup> {
    ensure!(
        outcomes.len() == group.key_count(),
        "group {}: {} outcomes for {} keys",
        group.range_label(),
        outcomes.len(),
        group.key_count()
    );

    let mut out = AssembledGroup::default();
    let mut outcomes = outcomes.into_iter();
    for bundle in &group.bundles {
        let records: Vec<Record> = bundle
            .keys
            .iter()
            .zip(outcomes.by_ref().take(bundle.len()))
            .filter_map(|(key, outcome)| match outcome {
                FetchOutcome::Payload(raw) => Some(Record {
                    key: key.clone(),
                    raw,
                }),
                FetchOutcome::Empty => None,
            })
            .collect();
        if records.is_empty() {
            tracing::debug!(first = %bundle.first(), last = %bundle.last(), "no content for bundle");
            out.empty.push(bundle.clone());
        } else {
            out.units.push(AssembledBundle {
                bundle: bundle.clone(),
                records,
            });
        }
    }
    Ok(out)
}
