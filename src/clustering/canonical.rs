// src/clustering/canonical.rs - Connected components of surviving pairs into an id mapping
use log::{info, warn};
use petgraph::unionfind::UnionFind;
use std::collections::{HashMap, HashSet};

use crate::models::core::CandidateId;
use crate::models::matching::{CanonicalMapping, Confidence, DuplicateCandidatePair};

/// Lowest confidence that may retire an id. Weaker pairs are reported only.
pub const MIN_MAPPING_CONFIDENCE: Confidence = Confidence::Medium;

/// Dense indices for the union-find, in order of first appearance.
struct IdIndex {
    ids: Vec<CandidateId>,
    positions: HashMap<CandidateId, usize>,
}

impl IdIndex {
    fn build(pairs: &[&DuplicateCandidatePair]) -> Self {
        let mut index = Self {
            ids: Vec::new(),
            positions: HashMap::new(),
        };
        for pair in pairs {
            index.insert(pair.id_1);
            index.insert(pair.id_2);
        }
        index
    }

    fn insert(&mut self, id: CandidateId) {
        if !self.positions.contains_key(&id) {
            self.positions.insert(id, self.ids.len());
            self.ids.push(id);
        }
    }

    fn position(&self, id: CandidateId) -> usize {
        self.positions[&id]
    }
}

/// Turns merged pairs into `id_dup -> id_canonical` rows.
///
/// Pairs are expected in merge order (highest confidence first). Every
/// connected component gets one canonical id: the `pref_id` of its first pair
/// that carries one, otherwise the lowest id. Each other member maps straight
/// to it, so no canonical id is ever also a duplicate. The note of a row comes
/// from the first pair touching that member.
pub fn build_canonical_mapping(pairs: &[DuplicateCandidatePair]) -> Vec<CanonicalMapping> {
    let eligible: Vec<&DuplicateCandidatePair> = pairs
        .iter()
        .filter(|p| p.confidence >= MIN_MAPPING_CONFIDENCE && p.id_1 != p.id_2)
        .collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let index = IdIndex::build(&eligible);
    let mut components: UnionFind<usize> = UnionFind::new(index.ids.len());
    for pair in &eligible {
        components.union(index.position(pair.id_1), index.position(pair.id_2));
    }

    let mut preferred_by_root: HashMap<usize, CandidateId> = HashMap::new();
    for pair in &eligible {
        let Some(pref) = pair.pref_id else { continue };
        if !pair.involves(pref) {
            warn!(
                "Ignoring preferred id {} outside its pair ({}, {})",
                pref, pair.id_1, pair.id_2
            );
            continue;
        }
        let root = components.find(index.position(pref));
        preferred_by_root.entry(root).or_insert(pref);
    }
    let mut lowest_by_root: HashMap<usize, CandidateId> = HashMap::new();
    for &id in &index.ids {
        let root = components.find(index.position(id));
        lowest_by_root
            .entry(root)
            .and_modify(|lowest| *lowest = (*lowest).min(id))
            .or_insert(id);
    }

    let canonical_of = |id: CandidateId| {
        let root = components.find(index.position(id));
        preferred_by_root
            .get(&root)
            .or_else(|| lowest_by_root.get(&root))
            .copied()
            .unwrap_or(id)
    };
    let canonical_name = |canonical: CandidateId| {
        eligible
            .iter()
            .find_map(|p| p.name_of(canonical))
            .unwrap_or_default()
            .to_string()
    };

    let mut mapped: HashSet<CandidateId> = HashSet::new();
    let mut rows: Vec<CanonicalMapping> = Vec::new();
    let mut chains_flattened = 0usize;
    for pair in &eligible {
        for id in [pair.id_2, pair.id_1] {
            let canonical = canonical_of(id);
            if id == canonical || !mapped.insert(id) {
                continue;
            }
            if !pair.involves(canonical) {
                chains_flattened += 1;
            }
            rows.push(CanonicalMapping {
                id_dup: id,
                id_canonical: canonical,
                name_canonical: canonical_name(canonical),
                note: pair.note(),
            });
        }
    }

    info!(
        "Canonical mapping: {} rows from {} pairs ({} mapped through a shared component)",
        rows.len(),
        eligible.len(),
        chains_flattened
    );
    rows
}
