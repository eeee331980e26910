// src/matching/spelling.rs - All-pairs spelling similarity over the candidate universe
use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::matching::name::{max_possible_ratio, normalize_name, similarity_ratio};
use crate::models::core::CandidateIdentity;
use crate::models::matching::SpellingCandidatePair;
use crate::utils::constants::DEFAULT_SPELLING_RATIO_THRESHOLD;

/// How the universe is partitioned before the all-pairs comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockingStrategy {
    /// One block holding every named identity; exhaustive.
    #[default]
    None,
    /// Bucket by the last normalized token of the display name.
    LastName,
}

impl fmt::Display for BlockingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingStrategy::None => f.write_str("none"),
            BlockingStrategy::LastName => f.write_str("last_name"),
        }
    }
}

impl FromStr for BlockingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" | "" => Ok(BlockingStrategy::None),
            "last_name" | "lastname" => Ok(BlockingStrategy::LastName),
            other => Err(format!("unknown blocking strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpellingOptions {
    /// Pairs are kept when the ratio is strictly greater than this.
    pub threshold: u8,
    pub blocking: BlockingStrategy,
    pub shards: usize,
}

impl Default for SpellingOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SPELLING_RATIO_THRESHOLD,
            blocking: BlockingStrategy::None,
            shards: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpellingScan {
    pub pairs: Vec<SpellingCandidatePair>,
    /// Pairs examined, including those pruned on length alone.
    pub comparisons: usize,
    pub blocks: usize,
}

/// `len` is the character count used for length pruning.
struct ScanEntry<'a> {
    identity: &'a CandidateIdentity,
    name: &'a str,
    len: usize,
}

/// One unit of work: compare row `row` of block `block` with every later row.
type RowTask = (usize, usize);

fn build_blocks(universe: &[CandidateIdentity], blocking: BlockingStrategy) -> Vec<Vec<usize>> {
    let named = universe
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name.as_deref().is_some_and(|n| !n.is_empty()));

    match blocking {
        BlockingStrategy::None => {
            let block: Vec<usize> = named.map(|(idx, _)| idx).collect();
            if block.len() < 2 {
                Vec::new()
            } else {
                vec![block]
            }
        }
        BlockingStrategy::LastName => {
            let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (idx, candidate) in named {
                let normalized = normalize_name(candidate.name.as_deref());
                if let Some(last) = normalized.split_whitespace().last() {
                    buckets.entry(last.to_string()).or_default().push(idx);
                }
            }
            buckets.into_values().filter(|b| b.len() >= 2).collect()
        }
    }
}

/// Splits the row tasks into at most `shards` groups of roughly equal pair count.
fn plan_shards(blocks: &[Vec<usize>], shards: usize) -> Vec<Vec<RowTask>> {
    let total: usize = blocks
        .iter()
        .map(|b| b.len() * b.len().saturating_sub(1) / 2)
        .sum();
    let shards = shards.max(1);
    let target = total.div_ceil(shards).max(1);

    let mut plan: Vec<Vec<RowTask>> = Vec::with_capacity(shards);
    let mut current: Vec<RowTask> = Vec::new();
    let mut current_cost = 0usize;
    for (block_idx, block) in blocks.iter().enumerate() {
        for row in 0..block.len().saturating_sub(1) {
            current.push((block_idx, row));
            current_cost += block.len() - row - 1;
            if current_cost >= target && plan.len() + 1 < shards {
                plan.push(std::mem::take(&mut current));
                current_cost = 0;
            }
        }
    }
    if !current.is_empty() {
        plan.push(current);
    }
    plan
}

fn scan_rows(
    entries: &[ScanEntry<'_>],
    blocks: &[Vec<usize>],
    tasks: &[RowTask],
    threshold: u8,
    progress: Option<&ProgressBar>,
) -> (Vec<SpellingCandidatePair>, usize) {
    let mut found = Vec::new();
    let mut comparisons = 0usize;
    for &(block_idx, row) in tasks {
        let block = &blocks[block_idx];
        let left = &entries[block[row]];
        for &other in &block[row + 1..] {
            let right = &entries[other];
            comparisons += 1;
            if left.identity.candidate_id == right.identity.candidate_id {
                continue;
            }
            if max_possible_ratio(left.len, right.len) <= threshold {
                continue;
            }
            let ratio = similarity_ratio(left.name, right.name);
            if ratio > threshold {
                found.push(review_row(left.identity, right.identity, ratio));
            }
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    (found, comparisons)
}

fn review_row(
    left: &CandidateIdentity,
    right: &CandidateIdentity,
    ratio: u8,
) -> SpellingCandidatePair {
    SpellingCandidatePair {
        id_1: left.candidate_id,
        id_2: right.candidate_id,
        name_1: left.name.clone().unwrap_or_default(),
        name_2: right.name.clone().unwrap_or_default(),
        office_1: left.office.clone(),
        district_id_1: Some(left.district_id),
        district_1: left.district.clone(),
        city_town_1: left.city_town.clone(),
        office_2: right.office.clone(),
        district_id_2: Some(right.district_id),
        district_2: right.district.clone(),
        city_town_2: right.city_town.clone(),
        ratio,
        same_person: None,
        pref_id: None,
    }
}

fn scan_entries(universe: &[CandidateIdentity]) -> Vec<ScanEntry<'_>> {
    universe
        .iter()
        .map(|identity| {
            let name = identity.name.as_deref().unwrap_or("");
            ScanEntry {
                identity,
                name,
                len: name.chars().count(),
            }
        })
        .collect()
}

/// Highest ratio first, then by pair key, so the output does not depend on
/// how the scan was sharded.
fn sort_pairs(pairs: &mut [SpellingCandidatePair]) {
    pairs.sort_by(|a, b| b.ratio.cmp(&a.ratio).then(a.pair_key().cmp(&b.pair_key())));
}

/// Number of row tasks a scan will run; used to size progress bars.
pub fn planned_rows(universe: &[CandidateIdentity], blocking: BlockingStrategy) -> u64 {
    build_blocks(universe, blocking)
        .iter()
        .map(|b| b.len().saturating_sub(1) as u64)
        .sum()
}

/// Every unordered pair of distinct, named identities whose similarity ratio
/// exceeds `options.threshold`. Identities without a name are never compared.
pub fn find_spelling_duplicates(
    universe: &[CandidateIdentity],
    options: &SpellingOptions,
) -> SpellingScan {
    let entries = scan_entries(universe);
    let blocks = build_blocks(universe, options.blocking);
    let mut scan = SpellingScan {
        blocks: blocks.len(),
        ..SpellingScan::default()
    };
    for tasks in plan_shards(&blocks, options.shards) {
        let (pairs, comparisons) = scan_rows(&entries, &blocks, &tasks, options.threshold, None);
        scan.pairs.extend(pairs);
        scan.comparisons += comparisons;
    }
    sort_pairs(&mut scan.pairs);
    scan
}

/// Same result as [`find_spelling_duplicates`], with each shard on a blocking
/// worker thread.
pub async fn find_spelling_duplicates_sharded(
    universe: Arc<Vec<CandidateIdentity>>,
    options: SpellingOptions,
    progress: Option<ProgressBar>,
) -> Result<SpellingScan> {
    let blocks = Arc::new(build_blocks(&universe, options.blocking));
    let plan = plan_shards(&blocks, options.shards);
    let block_count = blocks.len();

    let handles = plan.into_iter().map(|tasks| {
        let universe = Arc::clone(&universe);
        let blocks = Arc::clone(&blocks);
        let progress = progress.clone();
        tokio::task::spawn_blocking(move || {
            let entries = scan_entries(&universe);
            scan_rows(&entries, &blocks, &tasks, options.threshold, progress.as_ref())
        })
    });

    let mut scan = SpellingScan {
        blocks: block_count,
        ..SpellingScan::default()
    };
    for joined in join_all(handles).await {
        let (pairs, comparisons) = joined.context("Spelling scan shard panicked")?;
        scan.pairs.extend(pairs);
        scan.comparisons += comparisons;
    }
    if let Some(pb) = progress {
        pb.finish_with_message(format!("{} spelling pairs", scan.pairs.len()));
    }
    sort_pairs(&mut scan.pairs);
    Ok(scan)
}
