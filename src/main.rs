use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use dedupe_lib::matching::spelling::BlockingStrategy;
use dedupe_lib::models::matching::DetectionMethod;
use dedupe_lib::pipeline::{run_pipeline, RunContext};
use dedupe_lib::utils::config::{parse_detectors, DataSource, DedupConfig};
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::progress_bars::progress_config::ProgressConfig;
use log::info;
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

/// Flags override the matching environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about = "Find candidate ids that likely refer to the same person", long_about = None)]
struct DedupeArgs {
    /// Where participations are read from (csv or postgres)
    #[arg(long)]
    source: Option<DataSource>,

    /// Flattened candidate participation table
    #[arg(long)]
    candidates_csv: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    manual_overrides_csv: Option<PathBuf>,

    /// Previously confirmed id mapping, fed back as overrides
    #[arg(long)]
    confirmed_map_csv: Option<PathBuf>,

    /// Reviewed copy of the spelling review file
    #[arg(long)]
    reviewed_spelling_csv: Option<PathBuf>,

    /// Comma separated: spelling, consecutive_winner, same_district
    #[arg(long, value_parser = parse_detectors)]
    detectors: Option<BTreeSet<DetectionMethod>>,

    /// Spelling pairs are kept when the ratio is strictly above this
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    spelling_threshold: Option<u8>,

    /// Earliest second election for consecutive-winner detections (YYYY-MM-DD)
    #[arg(long)]
    recency_cutoff: Option<NaiveDate>,

    #[arg(long)]
    blocking: Option<BlockingStrategy>,

    #[arg(long)]
    shards: Option<usize>,

    /// Free text stored in the run summary
    #[arg(long)]
    description: Option<String>,
}

impl DedupeArgs {
    fn apply(self, config: &mut DedupConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(path) = self.candidates_csv {
            config.candidates_csv = path;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.manual_overrides_csv.is_some() {
            config.manual_overrides_csv = self.manual_overrides_csv;
        }
        if self.confirmed_map_csv.is_some() {
            config.confirmed_map_csv = self.confirmed_map_csv;
        }
        if self.reviewed_spelling_csv.is_some() {
            config.reviewed_spelling_csv = self.reviewed_spelling_csv;
        }
        if let Some(enabled) = self.detectors {
            config.detection.enabled = enabled;
        }
        if let Some(threshold) = self.spelling_threshold {
            config.detection.spelling_threshold = threshold;
        }
        if let Some(cutoff) = self.recency_cutoff {
            config.detection.recency_cutoff = cutoff;
        }
        if let Some(blocking) = self.blocking {
            config.detection.blocking = blocking;
        }
        if let Some(shards) = self.shards {
            config.detection.spelling_shards = shards.max(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting candidate duplicate detection pipeline");
    load_env();

    let args = DedupeArgs::parse();
    let description = args.description.clone();
    let mut config = DedupConfig::from_env();
    args.apply(&mut config);

    let progress = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress.enabled, progress.detailed
    );

    let run = RunContext {
        run_id: Uuid::new_v4().to_string(),
        run_timestamp: Utc::now().naive_utc(),
        description,
    };

    let outcome = run_pipeline(&config, &progress, &run).await?;

    info!("Run {} finished:", run.run_id);
    info!(
        "  {} participations, {} candidate ids, {} elections",
        outcome.stats.total_participations, outcome.stats.total_candidates, outcome.stats.total_elections
    );
    for method in &outcome.stats.method_stats {
        info!(
            "  {}: {} pairs ({} considered) in {:.2}s",
            method.method.as_str(),
            method.pairs_found,
            method.pairs_considered,
            method.duration_secs
        );
    }
    info!(
        "  {} merged pairs (high={}, medium={}, low={}), {} mapping rows",
        outcome.stats.merged_pairs,
        outcome.stats.merged_by_confidence.high,
        outcome.stats.merged_by_confidence.medium,
        outcome.stats.merged_by_confidence.low,
        outcome.stats.mapping_rows
    );
    info!("  Suggested mapping: {}", outcome.paths.suggested_mappings.display());
    info!("  Spelling review file: {}", outcome.paths.spelling_review.display());
    info!("  Run summary: {}", outcome.paths.run_summary.display());
    Ok(())
}
