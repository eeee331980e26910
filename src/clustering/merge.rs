// src/clustering/merge.rs - Confidence-ranked merge of every detection source
use log::{debug, info};
use std::collections::HashSet;

use crate::models::matching::{Confidence, DuplicateCandidatePair, PairKey};
use crate::models::stats_models::ConfidenceBreakdown;

/// Merge inputs in concatenation order. Among pairs of equal confidence the
/// earlier source wins, so manual overrides come first and unreviewed
/// spelling suggestions last.
#[derive(Debug, Clone, Default)]
pub struct MergeSources {
    pub manual: Vec<DuplicateCandidatePair>,
    pub confirmed_spelling: Vec<DuplicateCandidatePair>,
    pub consecutive_winner: Vec<DuplicateCandidatePair>,
    pub same_district: Vec<DuplicateCandidatePair>,
    pub unreviewed_spelling: Vec<DuplicateCandidatePair>,
}

impl MergeSources {
    fn into_concatenated(self) -> Vec<DuplicateCandidatePair> {
        let mut all = self.manual;
        all.extend(self.confirmed_spelling);
        all.extend(self.consecutive_winner);
        all.extend(self.same_district);
        all.extend(self.unreviewed_spelling);
        all
    }
}

/// One surviving pair per unordered id pair: the highest confidence wins and
/// ties keep the first-processed record. Pairs in `rejected` are dropped
/// whichever source produced them.
///
/// Output is ordered by confidence, then by `id_2`, both descending.
pub fn merge_detections(
    sources: MergeSources,
    rejected: &HashSet<PairKey>,
) -> Vec<DuplicateCandidatePair> {
    let mut all = sources.into_concatenated();
    let total = all.len();

    all.retain(|p| p.id_1 != p.id_2 && !rejected.contains(&p.pair_key()));
    let suppressed = total - all.len();

    // Stable: equal ranks keep concatenation order.
    all.sort_by(|a, b| b.confidence.rank().cmp(&a.confidence.rank()));

    let mut seen: HashSet<PairKey> = HashSet::with_capacity(all.len());
    all.retain(|p| seen.insert(p.pair_key()));

    all.sort_by(|a, b| b.confidence.cmp(&a.confidence).then(b.id_2.cmp(&a.id_2)));

    debug!("Merge dropped {} rejected or self pairs", suppressed);
    info!(
        "Merged {} detections into {} unique candidate id pairs",
        total,
        all.len()
    );
    all
}

pub fn confidence_breakdown(pairs: &[DuplicateCandidatePair]) -> ConfidenceBreakdown {
    let mut breakdown = ConfidenceBreakdown::default();
    for pair in pairs {
        match pair.confidence {
            Confidence::High => breakdown.high += 1,
            Confidence::Medium => breakdown.medium += 1,
            Confidence::Low => breakdown.low += 1,
        }
    }
    breakdown
}
