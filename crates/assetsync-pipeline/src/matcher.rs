//! Pairs each target record with at most one source record.
//!
//! External id is tried first (exact equality), then the target's name
//! fields in priority order against source display names (exact,
//! case-sensitive). When several sources share an id or a name, the first in
//! source order wins.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use assetsync_core::{SourceRecord, TargetRecord};
use serde::Serialize;

/// How a pair was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    ExternalId,
    /// Matched on the name field at this position in
    /// [`TargetRecord::name_candidates`] (0 = primary name).
    Name(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct MatchedPair<'a> {
    pub target: &'a TargetRecord,
    pub source: Option<&'a SourceRecord>,
    pub basis: Option<MatchBasis>,
}

/// Matches every target against `sources`, returning one entry per target
/// in target order. Pure apart from a warning per ambiguous source name.
#[must_use]
pub fn match_records<'a>(
    targets: &'a [TargetRecord],
    sources: &'a [SourceRecord],
) -> Vec<MatchedPair<'a>> {
    let mut by_id: HashMap<&str, &SourceRecord> = HashMap::with_capacity(sources.len());
    let mut by_name: HashMap<&str, &SourceRecord> = HashMap::with_capacity(sources.len());

    for source in sources {
        by_id.entry(source.external_id.as_str()).or_insert(source);
        match by_name.entry(source.name.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(source);
            }
            Entry::Occupied(existing) => {
                tracing::warn!(
                    name = %source.name,
                    kept = %existing.get().external_id,
                    ignored = %source.external_id,
                    "duplicate source name; first record in source order wins"
                );
            }
        }
    }

    targets
        .iter()
        .map(|target| {
            let by_external_id = target
                .external_id
                .as_deref()
                .and_then(|id| by_id.get(id).copied())
                .map(|source| (source, MatchBasis::ExternalId));

            let found = by_external_id.or_else(|| {
                target
                    .name_candidates()
                    .enumerate()
                    .filter(|(_, name)| !name.is_empty())
                    .find_map(|(idx, name)| {
                        by_name
                            .get(name)
                            .map(|source| (*source, MatchBasis::Name(idx)))
                    })
            });

            MatchedPair {
                target,
                source: found.map(|(s, _)| s),
                basis: found.map(|(_, b)| b),
            }
        })
        .collect()
}
