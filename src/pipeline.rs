// src/pipeline.rs - Load, detect, merge, canonicalize, report
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::clustering::canonical::build_canonical_mapping;
use crate::clustering::merge::{confidence_breakdown, merge_detections, MergeSources};
use crate::clustering::overrides::{
    apply_review, reported_duplicates, review_file_rows, OverrideRegistry,
};
use crate::data::csv_source::read_rows_if_present;
use crate::data::load_dataset;
use crate::matching::manager::{run_detectors, DetectionOutputs};
use crate::models::core::{CandidateId, CandidateIdentity};
use crate::models::matching::{PairKey, SpellingCandidatePair};
use crate::models::stats_models::PipelineStats;
use crate::report::{log_high_confidence_summary, write_reports, ReportPaths, RunArtifacts};
use crate::utils::config::DedupConfig;
use crate::utils::constants::SUMMARY_PAIR_LIMIT;
use crate::utils::get_memory_usage;
use crate::utils::progress_bars::logging::{
    log_pipeline_completion, log_pipeline_phase, log_pipeline_start,
};
use crate::utils::progress_bars::progress_config::{add_bar, ProgressConfig};

/// Identifies one run in logs and the run summary.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub artifacts: RunArtifacts,
    pub stats: PipelineStats,
    pub paths: ReportPaths,
}

/// Human inputs that steer the merge.
#[derive(Debug, Clone, Default)]
pub struct ReviewInputs {
    pub registry: OverrideRegistry,
    pub reviewed_spelling: Vec<SpellingCandidatePair>,
}

impl ReviewInputs {
    pub fn load(config: &DedupConfig) -> Result<Self> {
        let registry = OverrideRegistry::load(
            config.manual_overrides_csv.as_deref(),
            config.confirmed_map_csv.as_deref(),
        )?;
        let reviewed_spelling =
            read_rows_if_present(config.reviewed_spelling_csv.as_deref(), "reviewed spelling")
                .context("Failed to load reviewed spelling pairs")?;
        Ok(Self {
            registry,
            reviewed_spelling,
        })
    }
}

/// Pure resolution stage: detector outputs plus human inputs into the
/// merged pairs, the id mapping and the review artifacts.
pub fn resolve_detections(
    outputs: &DetectionOutputs,
    inputs: &ReviewInputs,
    identities: &HashMap<CandidateId, CandidateIdentity>,
) -> RunArtifacts {
    let review = apply_review(&outputs.spelling, &inputs.reviewed_spelling);
    let manual = inputs.registry.to_pairs(identities);
    let manual_rows = inputs.registry.review_rows(identities);

    // A `no` verdict rejects detections, never an explicit override.
    let manual_keys: HashSet<PairKey> = manual.iter().map(|p| p.pair_key()).collect();
    let rejected: HashSet<PairKey> = review
        .rejected
        .difference(&manual_keys)
        .copied()
        .collect();

    let merged_pairs = merge_detections(
        MergeSources {
            manual,
            confirmed_spelling: review.confirmed,
            consecutive_winner: outputs.consecutive_winner.clone(),
            same_district: outputs.same_district.clone(),
            unreviewed_spelling: review.unreviewed,
        },
        &rejected,
    );
    let mappings = build_canonical_mapping(&merged_pairs);

    let review_rows = review_file_rows(&outputs.spelling, &inputs.reviewed_spelling, &manual_rows);
    let mut confirmed_rows = manual_rows;
    confirmed_rows.extend(review.confirmed_rows);
    let reported = reported_duplicates(&confirmed_rows);

    RunArtifacts {
        review_rows,
        merged_pairs,
        mappings,
        reported,
    }
}

pub async fn run_pipeline(
    config: &DedupConfig,
    progress: &ProgressConfig,
    run: &RunContext,
) -> Result<PipelineOutcome> {
    let start = Instant::now();
    log_pipeline_start(&run.run_id, config.detection.enabled.len());
    config.log_config();

    let mut stats = PipelineStats::new(&run.run_id, run.run_timestamp, config.source.as_str());
    stats.description = run.description.clone();

    let multi_progress = progress.create_multi_progress();
    let main_pb = add_bar(multi_progress.as_ref(), 4, "Loading participations");

    // Phase 1: load
    log_pipeline_phase("Load", Some(config.source.as_str()));
    let load_start = Instant::now();
    let dataset = load_dataset(config)
        .await
        .context("Failed to load candidate participations")?;
    let inputs = ReviewInputs::load(config)?;
    let identities = dataset.identities_by_id();
    stats.total_participations = dataset.participations().len();
    stats.total_candidates = identities.len();
    stats.total_elections = dataset.election_count();
    stats.manual_overrides = inputs.registry.len();
    let inconsistent = dataset.inconsistent_candidate_ids();
    stats.inconsistent_candidate_ids = inconsistent.len();
    if !inconsistent.is_empty() {
        warn!(
            "{} candidate ids disagree on first/last name across participations; latest row is used (e.g. {:?})",
            inconsistent.len(),
            &inconsistent[..inconsistent.len().min(5)]
        );
    }
    if dataset.is_empty() {
        info!("No candidate participations loaded; every detector will report zero pairs");
    }
    stats.load_time = load_start.elapsed().as_secs_f64();
    info!(
        "Loaded {} participations for {} candidates in {} elections ({:.2}s)",
        stats.total_participations, stats.total_candidates, stats.total_elections, stats.load_time
    );
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Running detectors");
    }

    // Phase 2: detect
    let detect_start = Instant::now();
    let detector_progress = if progress.should_show_detailed() {
        multi_progress.clone()
    } else {
        None
    };
    let outputs = run_detectors(Arc::new(dataset), &config.detection, detector_progress).await;
    stats.detection_time = detect_start.elapsed().as_secs_f64();
    stats.method_stats = outputs.stats.clone();
    if progress.should_show_memory() {
        info!("Memory after detection: {} MB", get_memory_usage());
    }
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Merging detections");
    }

    // Phase 3: merge and canonicalize
    log_pipeline_phase("Merge", Some("confidence-ranked dedupe and canonical ids"));
    let artifacts = resolve_detections(&outputs, &inputs, &identities);
    stats.merged_pairs = artifacts.merged_pairs.len();
    stats.merged_by_confidence = confidence_breakdown(&artifacts.merged_pairs);
    stats.mapping_rows = artifacts.mappings.len();
    stats.reported_duplicates = artifacts.reported.len();
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Writing reports");
    }

    // Phase 4: report
    log_pipeline_phase("Report", Some(&config.output_dir.display().to_string()));
    stats.total_processing_time = start.elapsed().as_secs_f64();
    let paths = write_reports(&config.output_dir, &artifacts, &stats)?;
    log_high_confidence_summary(&artifacts.merged_pairs, SUMMARY_PAIR_LIMIT);
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message("Pipeline complete");
    }

    log_pipeline_completion(start.elapsed(), stats.merged_pairs, stats.mapping_rows);
    Ok(PipelineOutcome {
        artifacts,
        stats,
        paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::overrides::ManualOverride;
    use crate::data::dataset::test_support::{date, participation};
    use crate::data::dataset::ElectionDataset;
    use crate::models::matching::{Confidence, DetectionMethod, ReviewVerdict};
    use crate::utils::config::DetectionConfig;

    fn dataset() -> ElectionDataset {
        let mut first = participation(11, 100, "John Smith", 7, date(2018, 11, 6));
        first.is_winner = true;
        let mut second = participation(12, 200, "John A. Smith", 7, date(2020, 11, 3));
        second.is_winner = true;
        let third = participation(13, 200, "Jon A. Smith", 7, date(2020, 11, 3));
        let fourth = participation(40, 300, "Maria Santos", 3, date(2020, 11, 3));
        let fifth = participation(41, 301, "Maria Santos", 4, date(2022, 11, 8));
        ElectionDataset::new(vec![first, second, third, fourth, fifth])
    }

    async fn detect(dataset: &ElectionDataset) -> DetectionOutputs {
        run_detectors(Arc::new(dataset.clone()), &DetectionConfig::default(), None).await
    }

    #[tokio::test]
    async fn test_resolution_without_human_input() {
        let dataset = dataset();
        let outputs = detect(&dataset).await;
        let artifacts = resolve_detections(&outputs, &ReviewInputs::default(), &dataset.identities_by_id());

        // (11, 12) from both relational detectors collapses to the high one.
        let first = &artifacts.merged_pairs[0];
        assert_eq!(first.pair_key(), (11, 12));
        assert_eq!(first.detection_method, DetectionMethod::ConsecutiveWinner);
        let keys: HashSet<PairKey> = artifacts.merged_pairs.iter().map(|p| p.pair_key()).collect();
        assert_eq!(keys.len(), artifacts.merged_pairs.len());

        // Unreviewed spelling suggestions are reported but never mapped.
        assert_eq!(artifacts.mappings.len(), 1);
        assert_eq!((artifacts.mappings[0].id_dup, artifacts.mappings[0].id_canonical), (12, 11));
        assert!(artifacts.reported.is_empty());
        assert!(artifacts.review_rows.iter().all(|r| r.same_person.is_none()));
    }

    #[tokio::test]
    async fn test_review_and_overrides_steer_the_mapping() {
        let dataset = dataset();
        let outputs = detect(&dataset).await;
        let santos = outputs
            .spelling
            .iter()
            .find(|r| r.pair_key() == (40, 41))
            .cloned()
            .expect("identical names are a spelling pair");
        let mut jon = outputs
            .spelling
            .iter()
            .find(|r| r.pair_key() == (12, 13))
            .cloned()
            .expect("one letter apart");
        jon.same_person = Some(ReviewVerdict::No);
        let mut santos_yes = santos.clone();
        santos_yes.same_person = Some(ReviewVerdict::Yes);
        santos_yes.pref_id = Some(41);

        let inputs = ReviewInputs {
            registry: OverrideRegistry::new(vec![ManualOverride {
                id_1: 13,
                id_2: 11,
                name_1: String::new(),
                name_2: String::new(),
                office: String::new(),
                district_1: String::new(),
                city_town_1: None,
                district_2: String::new(),
                city_town_2: None,
                pref_id: Some(11),
            }]),
            reviewed_spelling: vec![jon, santos_yes],
        };
        let artifacts = resolve_detections(&outputs, &inputs, &dataset.identities_by_id());

        let mapped: HashMap<CandidateId, CandidateId> = artifacts
            .mappings
            .iter()
            .map(|m| (m.id_dup, m.id_canonical))
            .collect();
        assert_eq!(mapped.get(&40), Some(&41));
        assert_eq!(mapped.get(&12), Some(&11));
        assert_eq!(mapped.get(&13), Some(&11));
        assert!(!artifacts.merged_pairs.iter().any(|p| p.pair_key() == (12, 13)));
        assert!(artifacts
            .merged_pairs
            .iter()
            .any(|p| p.pair_key() == (11, 13) && p.confidence == Confidence::High));

        let reported: Vec<(CandidateId, CandidateId)> =
            artifacts.reported.iter().map(|r| (r.id_pref, r.id_dup)).collect();
        assert_eq!(reported, vec![(11, 13), (41, 40)]);
        assert_eq!(artifacts.review_rows[0].same_person, Some(ReviewVerdict::Yes));
    }

    #[tokio::test]
    async fn test_full_run_on_empty_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("candidates.csv");
        std::fs::write(
            &csv_path,
            "candidate_id,election_id,name,first_name,middle_name,last_name,office,district_id,district,city_town,is_winner,is_incumbent,election_date\n",
        )
        .unwrap();
        let config = DedupConfig {
            candidates_csv: csv_path,
            output_dir: dir.path().join("out"),
            confirmed_map_csv: None,
            ..DedupConfig::default()
        };
        let progress = ProgressConfig {
            enabled: false,
            detailed: false,
            show_memory: false,
        };
        let run = RunContext {
            run_id: "test-run".to_string(),
            run_timestamp: date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
            description: None,
        };

        let outcome = run_pipeline(&config, &progress, &run).await.unwrap();
        assert_eq!(outcome.stats.total_participations, 0);
        assert_eq!(outcome.stats.merged_pairs, 0);
        assert!(outcome.artifacts.mappings.is_empty());
        assert!(outcome.paths.suggested_mappings.exists());
        assert!(outcome.paths.run_summary.exists());
    }
}
