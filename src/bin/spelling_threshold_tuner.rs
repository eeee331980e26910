// src/bin/spelling_threshold_tuner.rs
//
// Scans the candidate universe once at a low ratio floor, then reports how
// many spelling pairs would survive at each threshold above it. When a
// reviewed spelling file is available, each row also shows how many of the
// surviving pairs a reviewer marked yes or no.

use anyhow::{Context, Result};
use clap::Parser;
use dedupe_lib::data::csv_source::read_rows_if_present;
use dedupe_lib::data::load_dataset;
use dedupe_lib::matching::spelling::{find_spelling_duplicates_sharded, planned_rows, SpellingOptions};
use dedupe_lib::models::matching::{PairKey, ReviewVerdict, SpellingCandidatePair};
use dedupe_lib::utils::config::DedupConfig;
use dedupe_lib::utils::constants::DEFAULT_SPELLING_RATIO_THRESHOLD;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::progress_bars::progress_config::{add_bar, ProgressConfig};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Spelling pair counts across ratio thresholds", long_about = None)]
struct TunerArgs {
    /// Lowest threshold reported; the scan keeps pairs strictly above it
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=99))]
    floor: u8,

    /// Step between reported thresholds
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=20))]
    step: u8,
}

#[derive(Debug, Default, Clone, Copy)]
struct TierCounts {
    pairs: usize,
    reviewed_yes: usize,
    reviewed_no: usize,
}

fn count_survivors(
    pairs: &[SpellingCandidatePair],
    verdicts: &HashMap<PairKey, ReviewVerdict>,
    threshold: u8,
) -> TierCounts {
    let mut counts = TierCounts::default();
    for pair in pairs.iter().filter(|p| p.ratio > threshold) {
        counts.pairs += 1;
        match verdicts.get(&pair.pair_key()) {
            Some(ReviewVerdict::Yes) => counts.reviewed_yes += 1,
            Some(ReviewVerdict::No) => counts.reviewed_no += 1,
            None => {}
        }
    }
    counts
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    env_logger::init();
    let args = TunerArgs::parse();

    info!("Starting spelling threshold tuner (floor {}, step {})", args.floor, args.step);
    let config = DedupConfig::from_env();
    let progress = ProgressConfig::from_env();

    let dataset = load_dataset(&config)
        .await
        .context("Failed to load candidate participations")?;
    let universe = dataset.candidate_universe();
    if universe.len() < 2 {
        warn!("Need at least 2 candidate ids to compare, found {}. Exiting.", universe.len());
        return Ok(());
    }

    let reviewed: Vec<SpellingCandidatePair> =
        read_rows_if_present(config.reviewed_spelling_csv.as_deref(), "reviewed spelling")?;
    let verdicts: HashMap<PairKey, ReviewVerdict> = reviewed
        .iter()
        .filter_map(|r| r.same_person.map(|v| (r.pair_key(), v)))
        .collect();

    let options = SpellingOptions {
        threshold: args.floor,
        blocking: config.detection.blocking,
        shards: config.detection.spelling_shards,
    };
    let multi_progress = progress.create_multi_progress();
    let pb = add_bar(
        multi_progress.as_ref(),
        planned_rows(&universe, options.blocking),
        "Scanning candidate names",
    );
    let scan = find_spelling_duplicates_sharded(Arc::new(universe), options, pb).await?;
    info!(
        "Scan complete: {} pairs above {} from {} comparisons",
        scan.pairs.len(),
        args.floor,
        scan.comparisons
    );

    println!();
    println!("{:>9} {:>8} {:>6} {:>6}", "ratio >", "pairs", "yes", "no");
    let mut threshold = args.floor;
    while threshold < 100 {
        let counts = count_survivors(&scan.pairs, &verdicts, threshold);
        let marker = if threshold == DEFAULT_SPELLING_RATIO_THRESHOLD { "  <- current" } else { "" };
        println!(
            "{:>9} {:>8} {:>6} {:>6}{}",
            threshold, counts.pairs, counts.reviewed_yes, counts.reviewed_no, marker
        );
        threshold = threshold.saturating_add(args.step);
    }
    if verdicts.is_empty() {
        println!("\nNo reviewed spelling file; set REVIEWED_SPELLING_CSV to see yes/no counts.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(id_1: i64, id_2: i64, ratio: u8) -> SpellingCandidatePair {
        SpellingCandidatePair {
            id_1,
            id_2,
            name_1: String::new(),
            name_2: String::new(),
            office_1: String::new(),
            district_id_1: None,
            district_1: String::new(),
            city_town_1: None,
            office_2: String::new(),
            district_id_2: None,
            district_2: String::new(),
            city_town_2: None,
            ratio,
            same_person: None,
            pref_id: None,
        }
    }

    #[test]
    fn test_survivors_respect_strict_threshold() {
        let pairs = vec![pair(1, 2, 95), pair(3, 4, 91), pair(5, 6, 90)];
        let verdicts = HashMap::from([((1, 2), ReviewVerdict::Yes), ((5, 6), ReviewVerdict::No)]);

        let at_90 = count_survivors(&pairs, &verdicts, 90);
        assert_eq!((at_90.pairs, at_90.reviewed_yes, at_90.reviewed_no), (2, 1, 0));
        let at_85 = count_survivors(&pairs, &verdicts, 85);
        assert_eq!((at_85.pairs, at_85.reviewed_yes, at_85.reviewed_no), (3, 1, 1));
    }
}
