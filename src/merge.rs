use std::cell::Cell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{PairKey, RawComparisonRecord, Similarity, SimilarityRecord, WordPair};
use crate::result_table::{ResultRow, ResultTable, SourceId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceMergeStats {
    pub records: usize,
    pub distinct_resolved: usize,
    pub missing_rows: usize,
    pub unmatched_records: usize,
    pub conflicts: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub canonical_pairs: usize,
    pub distinct_pairs: usize,
    pub lookups: usize,
    pub source_1: SourceMergeStats,
    pub source_2: SourceMergeStats,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: ResultTable,
    pub stats: MergeStats,
    pub warnings: Vec<String>,
}

struct SourceIndex {
    name: &'static str,
    scores: HashMap<PairKey, Similarity>,
    records: usize,
    conflicts: usize,
    lookups: Cell<usize>,
}

impl SourceIndex {
    // First record for a key wins; a later record with a different value is a conflict.
    fn build(
        name: &'static str,
        entries: impl Iterator<Item = (PairKey, Similarity)>,
        warnings: &mut Vec<String>,
    ) -> Self {
        let mut scores = HashMap::<PairKey, Similarity>::new();
        let mut records = 0;
        let mut conflicts = 0;

        for (key, similarity) in entries {
            records += 1;
            match scores.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(similarity);
                }
                Entry::Occupied(slot) if *slot.get() == similarity => {}
                Entry::Occupied(slot) => {
                    conflicts += 1;
                    let (key, existing) = (slot.key(), slot.get());
                    warn!(source = name, pair = %key, kept = %existing, dropped = %similarity, "conflicting duplicate score");
                    warnings.push(format!(
                        "{name}: pair '{key}' scored both {existing} and {similarity}; keeping {existing}"
                    ));
                }
            }
        }

        Self {
            name,
            scores,
            records,
            conflicts,
            lookups: Cell::new(0),
        }
    }

    fn resolve(&self, key: &PairKey) -> Option<Similarity> {
        self.lookups.set(self.lookups.get() + 1);
        self.scores.get(key).copied()
    }

    fn unmatched(&self, requested: &HashSet<&PairKey>, warnings: &mut Vec<String>) -> usize {
        let mut keys = self
            .scores
            .keys()
            .filter(|key| !requested.contains(key))
            .collect::<Vec<&PairKey>>();
        keys.sort();

        for key in &keys {
            warn!(source = self.name, pair = %key, "scored pair matches no stimulus pair");
            warnings.push(format!(
                "{}: pair '{key}' matches no stimulus pair",
                self.name
            ));
        }
        keys.len()
    }
}

/// Joins both similarity sources onto the canonical pairs by order-independent
/// pair identity. Absent scores become `Similarity::Missing`.
pub fn merge(
    canonical_pairs: &[WordPair],
    raw_records: &[RawComparisonRecord],
    second_source: &[SimilarityRecord],
) -> MergeOutcome {
    let mut warnings = Vec::new();

    let source_1 = SourceIndex::build(
        "source_1",
        raw_records
            .iter()
            .map(|record| (record.key(), record.similarity)),
        &mut warnings,
    );
    let source_2 = SourceIndex::build(
        "source_2",
        second_source
            .iter()
            .map(|record| (record.key(), record.similarity)),
        &mut warnings,
    );

    let keys = canonical_pairs
        .iter()
        .map(WordPair::key)
        .collect::<Vec<PairKey>>();

    // Each distinct pair is resolved once per source and shared by every triad using it.
    let mut resolved = HashMap::<&PairKey, (Option<Similarity>, Option<Similarity>)>::new();
    for key in &keys {
        resolved
            .entry(key)
            .or_insert_with(|| (source_1.resolve(key), source_2.resolve(key)));
    }

    let mut stats = MergeStats {
        canonical_pairs: canonical_pairs.len(),
        distinct_pairs: resolved.len(),
        lookups: source_1.lookups.get() + source_2.lookups.get(),
        source_1: SourceMergeStats {
            records: source_1.records,
            distinct_resolved: resolved.values().filter(|(s1, _)| s1.is_some()).count(),
            conflicts: source_1.conflicts,
            ..SourceMergeStats::default()
        },
        source_2: SourceMergeStats {
            records: source_2.records,
            distinct_resolved: resolved.values().filter(|(_, s2)| s2.is_some()).count(),
            conflicts: source_2.conflicts,
            ..SourceMergeStats::default()
        },
    };

    let rows = canonical_pairs
        .iter()
        .zip(&keys)
        .map(|(pair, key)| {
            let (s1, s2) = resolved.get(key).copied().unwrap_or((None, None));
            ResultRow {
                list_id: pair.list_id.clone(),
                match_type: pair.match_type,
                word_pair: pair.render(),
                similarity_source_1: s1.unwrap_or(Similarity::Missing),
                similarity_source_2: s2.unwrap_or(Similarity::Missing),
                label_source_1: None,
                label_source_2: None,
            }
        })
        .collect::<Vec<ResultRow>>();

    let requested = resolved.keys().copied().collect::<HashSet<&PairKey>>();
    stats.source_1.unmatched_records = source_1.unmatched(&requested, &mut warnings);
    stats.source_2.unmatched_records = source_2.unmatched(&requested, &mut warnings);

    let table = ResultTable::new(rows);
    stats.source_1.missing_rows = table.missing_count(SourceId::Source1);
    stats.source_2.missing_rows = table.missing_count(SourceId::Source2);

    info!(
        canonical_pairs = stats.canonical_pairs,
        distinct_pairs = stats.distinct_pairs,
        source_1_missing = stats.source_1.missing_rows,
        source_2_missing = stats.source_2.missing_rows,
        source_1_unmatched = stats.source_1.unmatched_records,
        source_2_unmatched = stats.source_2.unmatched_records,
        "merged similarity sources"
    );

    MergeOutcome {
        table,
        stats,
        warnings,
    }
}
