// src/matching/manager.rs - Runs the enabled detectors concurrently and collects their outputs
use anyhow::Result;
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::data::dataset::ElectionDataset;
use crate::matching::consecutive_winner::find_consecutive_winner_duplicates;
use crate::matching::same_district::find_same_district_duplicates;
use crate::matching::spelling::{find_spelling_duplicates_sharded, planned_rows, SpellingOptions};
use crate::matching::DetectorRun;
use crate::models::matching::{DetectionMethod, DuplicateCandidatePair, SpellingCandidatePair};
use crate::models::stats_models::DetectionStats;
use crate::utils::config::DetectionConfig;
use crate::utils::progress_bars::logging::{
    log_pipeline_method_completed, log_pipeline_method_failed, log_pipeline_phase,
    DetectionLogger,
};
use crate::utils::progress_bars::progress_config::add_bar;

/// Raw, unmerged detector results for one run.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutputs {
    pub spelling: Vec<SpellingCandidatePair>,
    pub consecutive_winner: Vec<DuplicateCandidatePair>,
    pub same_district: Vec<DuplicateCandidatePair>,
    pub stats: Vec<DetectionStats>,
    pub failed: Vec<DetectionMethod>,
}

enum DetectorOutput {
    Spelling(Vec<SpellingCandidatePair>, DetectionStats),
    Relational(DetectionMethod, DetectorRun),
}

async fn run_spelling(
    dataset: Arc<ElectionDataset>,
    options: SpellingOptions,
    multi_progress: Option<MultiProgress>,
) -> Result<DetectorOutput> {
    let logger = DetectionLogger::new(DetectionMethod::Spelling);
    logger.log_start(&format!(
        "ratio > {}, blocking={}, shards={}",
        options.threshold, options.blocking, options.shards
    ));

    let universe = Arc::new(dataset.candidate_universe());
    logger.log_data_loaded(universe.len(), "candidate identity");
    let unnamed = universe.iter().filter(|c| c.name.is_none()).count();
    logger.log_data_quality_issue("candidate identities without a name", unnamed);

    let rows = planned_rows(&universe, options.blocking);
    let pb = add_bar(multi_progress.as_ref(), rows, "Spelling scan");
    logger.log_phase("All-pairs scan", Some(&format!("{} rows to scan", rows)));

    let scan = find_spelling_duplicates_sharded(universe, options, pb).await?;
    logger.log_pair_generation(scan.comparisons, scan.blocks);
    logger.log_completion(scan.pairs.len());
    let stats = logger.stats(scan.comparisons, scan.pairs.len());
    Ok(DetectorOutput::Spelling(scan.pairs, stats))
}

fn spawn_detector(
    method: DetectionMethod,
    dataset: Arc<ElectionDataset>,
    config: &DetectionConfig,
    multi_progress: Option<MultiProgress>,
    overall: Option<ProgressBar>,
) -> JoinHandle<Result<DetectorOutput>> {
    let recency_cutoff = config.recency_cutoff;
    let options = SpellingOptions {
        threshold: config.spelling_threshold,
        blocking: config.blocking,
        shards: config.spelling_shards,
    };
    tokio::spawn(async move {
        let output = match method {
            DetectionMethod::Spelling => run_spelling(dataset, options, multi_progress).await,
            DetectionMethod::ConsecutiveWinner => tokio::task::spawn_blocking(move || {
                find_consecutive_winner_duplicates(&dataset, recency_cutoff)
            })
            .await
            .map(|run| DetectorOutput::Relational(method, run))
            .map_err(anyhow::Error::from),
            DetectionMethod::SameDistrict => {
                tokio::task::spawn_blocking(move || find_same_district_duplicates(&dataset))
                    .await
                    .map(|run| DetectorOutput::Relational(method, run))
                    .map_err(anyhow::Error::from)
            }
            DetectionMethod::Manual => Err(anyhow::anyhow!("manual overrides are not a detector")),
        };
        if let Some(pb) = overall {
            pb.inc(1);
        }
        output
    })
}

/// Runs every enabled detector on its own task. A detector that fails or
/// panics is logged and reported in `failed`; the others still contribute.
pub async fn run_detectors(
    dataset: Arc<ElectionDataset>,
    config: &DetectionConfig,
    multi_progress: Option<MultiProgress>,
) -> DetectionOutputs {
    let start = Instant::now();
    let methods: Vec<DetectionMethod> = config.enabled.iter().copied().collect();
    log_pipeline_phase(
        "Detection",
        Some(&format!("{} detectors over {} participations", methods.len(), dataset.participations().len())),
    );

    let overall = add_bar(multi_progress.as_ref(), methods.len() as u64, "Detectors");
    let handles: Vec<JoinHandle<Result<DetectorOutput>>> = methods
        .iter()
        .map(|&method| {
            spawn_detector(
                method,
                Arc::clone(&dataset),
                config,
                multi_progress.clone(),
                overall.clone(),
            )
        })
        .collect();

    let mut outputs = DetectionOutputs::default();
    for (method, joined) in methods.iter().copied().zip(join_all(handles).await) {
        let result = joined.map_err(anyhow::Error::from).and_then(|r| r);
        match result {
            Ok(DetectorOutput::Spelling(pairs, stats)) => {
                log_pipeline_method_completed(&stats);
                outputs.spelling = pairs;
                outputs.stats.push(stats);
            }
            Ok(DetectorOutput::Relational(method, run)) => {
                log_pipeline_method_completed(&run.stats);
                match method {
                    DetectionMethod::ConsecutiveWinner => outputs.consecutive_winner = run.pairs,
                    _ => outputs.same_district = run.pairs,
                }
                outputs.stats.push(run.stats);
            }
            Err(e) => {
                log_pipeline_method_failed(method, &format!("{:?}", e));
                outputs.failed.push(method);
            }
        }
    }

    if let Some(pb) = overall {
        pb.finish_with_message("Detectors finished");
    }
    if outputs.failed.is_empty() {
        info!(
            "🎯 All {} detectors completed in {:.2?}",
            methods.len(),
            start.elapsed()
        );
    } else {
        warn!(
            "⚠️  {} of {} detectors failed: {:?}",
            outputs.failed.len(),
            methods.len(),
            outputs.failed
        );
    }
    outputs
}
