// src/report/writer.rs - Output artifacts: review file, detailed report, id mappings, run summary
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::matching::{
    CanonicalMapping, Confidence, DuplicateCandidatePair, PreferredPairReport,
    SpellingCandidatePair,
};
use crate::models::stats_models::PipelineStats;

const SPELLING_REVIEW_FILE: &str = "possible-candidate-dupes.csv";
const DETAILED_REPORT_FILE: &str = "potential-name-variation-duplicates.csv";
const SUGGESTED_MAPPINGS_FILE: &str = "suggested-id-mappings.csv";
const REPORTED_DUPLICATES_FILE: &str = "reported-duplicates.csv";
const RUN_SUMMARY_FILE: &str = "run_summary.json";

// Headers are written explicitly so an empty result still yields a usable file.
const SPELLING_REVIEW_HEADER: [&str; 15] = [
    "id_1", "id_2", "name_1", "name_2", "office_1", "district_id_1", "district_1", "city_town_1",
    "office_2", "district_id_2", "district_2", "city_town_2", "ratio", "same_person", "pref_id",
];
const DETAILED_REPORT_HEADER: [&str; 10] = [
    "id_1", "name_1", "id_2", "name_2", "office", "district_id", "detection_method", "confidence",
    "evidence_score", "pref_id",
];
const MAPPING_HEADER: [&str; 4] = ["id_dup", "id_canonical", "name_canonical", "note"];
const REPORTED_DUPLICATES_HEADER: [&str; 10] = [
    "id_pref", "name_pref", "office_pref", "district_pref", "city_town_pref", "id_dup", "name_dup",
    "office_dup", "district_dup", "city_town_dup",
];

/// Everything one run hands to the output layer.
#[derive(Debug, Clone, Default)]
pub struct RunArtifacts {
    pub review_rows: Vec<SpellingCandidatePair>,
    pub merged_pairs: Vec<DuplicateCandidatePair>,
    pub mappings: Vec<CanonicalMapping>,
    pub reported: Vec<PreferredPairReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub spelling_review: PathBuf,
    pub detailed_report: PathBuf,
    pub suggested_mappings: PathBuf,
    pub reported_duplicates: PathBuf,
    pub run_summary: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            spelling_review: dir.join(SPELLING_REVIEW_FILE),
            detailed_report: dir.join(DETAILED_REPORT_FILE),
            suggested_mappings: dir.join(SUGGESTED_MAPPINGS_FILE),
            reported_duplicates: dir.join(REPORTED_DUPLICATES_FILE),
            run_summary: dir.join(RUN_SUMMARY_FILE),
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer
        .write_record(header)
        .with_context(|| format!("Failed to write header of {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!("Saved {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn write_summary(path: &Path, stats: &PipelineStats) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, stats)
        .with_context(|| format!("Failed to write run summary {}", path.display()))?;
    info!("Saved run summary to {}", path.display());
    Ok(())
}

/// Writes every artifact under `output_dir`, creating it when missing.
pub fn write_reports(
    output_dir: &Path,
    artifacts: &RunArtifacts,
    stats: &PipelineStats,
) -> Result<ReportPaths> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let paths = ReportPaths::in_dir(output_dir);

    write_csv(&paths.spelling_review, &SPELLING_REVIEW_HEADER, &artifacts.review_rows)?;
    write_csv(&paths.detailed_report, &DETAILED_REPORT_HEADER, &artifacts.merged_pairs)?;
    write_csv(&paths.suggested_mappings, &MAPPING_HEADER, &artifacts.mappings)?;
    write_csv(&paths.reported_duplicates, &REPORTED_DUPLICATES_HEADER, &artifacts.reported)?;
    write_summary(&paths.run_summary, stats)?;

    info!(
        "Review the suggested mappings in {} and promote confirmed ones into the confirmed id map",
        paths.suggested_mappings.display()
    );
    Ok(paths)
}

/// Console summary of the first `limit` high-confidence pairs.
pub fn log_high_confidence_summary(pairs: &[DuplicateCandidatePair], limit: usize) {
    info!("{}", "=".repeat(80));
    info!("SUMMARY OF HIGH-CONFIDENCE DUPLICATES");
    info!("{}", "=".repeat(80));
    let high = pairs.iter().filter(|p| p.confidence == Confidence::High);
    for pair in high.take(limit) {
        let district = pair
            .district_id
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        info!("{} - {}", pair.office, district);
        info!("  ID {}: {}", pair.id_1, pair.name_1);
        info!("  ID {}: {}", pair.id_2, pair.name_2);
        info!("  Detection: {}", pair.detection_method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::csv_source::read_rows;
    use crate::models::matching::{DetectionMethod, ReviewVerdict};
    use chrono::NaiveDate;

    fn stats() -> PipelineStats {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        PipelineStats::new("run-1", ts, "csv")
    }

    fn artifacts() -> RunArtifacts {
        RunArtifacts {
            review_rows: vec![SpellingCandidatePair {
                id_1: 9,
                id_2: 8,
                name_1: "Kathleen O'Connor Ives".to_string(),
                name_2: "Kathleen OConnor Ives".to_string(),
                office_1: "State Senate".to_string(),
                district_id_1: Some(1),
                district_1: "1st Essex".to_string(),
                city_town_1: Some("Newburyport".to_string()),
                office_2: "State Senate".to_string(),
                district_id_2: Some(1),
                district_2: "1st Essex".to_string(),
                city_town_2: None,
                ratio: 98,
                same_person: Some(ReviewVerdict::Yes),
                pref_id: Some(8),
            }],
            merged_pairs: vec![DuplicateCandidatePair {
                id_1: 11,
                name_1: "John Smith".to_string(),
                id_2: 12,
                name_2: "John A. Smith".to_string(),
                office: "State Representative".to_string(),
                district_id: Some(7),
                detection_method: DetectionMethod::ConsecutiveWinner,
                confidence: Confidence::High,
                evidence_score: 728.0,
                pref_id: None,
            }],
            mappings: vec![CanonicalMapping {
                id_dup: 12,
                id_canonical: 11,
                name_canonical: "John Smith".to_string(),
                note: "consecutive_winner - high confidence".to_string(),
            }],
            reported: Vec::new(),
        }
    }

    #[test]
    fn test_reports_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let paths = write_reports(&out, &artifacts(), &stats()).unwrap();

        let review: Vec<SpellingCandidatePair> = read_rows(&paths.spelling_review).unwrap();
        assert_eq!(review, artifacts().review_rows);

        let mappings: Vec<CanonicalMapping> = read_rows(&paths.suggested_mappings).unwrap();
        assert_eq!(mappings, artifacts().mappings);

        let detailed = fs::read_to_string(&paths.detailed_report).unwrap();
        assert!(detailed.starts_with("id_1,name_1,id_2,name_2,office,district_id,detection_method"));
        assert!(detailed.contains("consecutive_winner,high,728.0,"));
    }

    #[test]
    fn test_empty_outputs_keep_headers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(dir.path(), &RunArtifacts::default(), &stats()).unwrap();
        let reported = fs::read_to_string(&paths.reported_duplicates).unwrap();
        assert_eq!(reported.trim_end(), REPORTED_DUPLICATES_HEADER.join(","));
        let mappings: Vec<CanonicalMapping> = read_rows(&paths.suggested_mappings).unwrap();
        assert!(mappings.is_empty());
    }

    #[test]
    fn test_summary_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(dir.path(), &RunArtifacts::default(), &stats()).unwrap();
        let raw = fs::read_to_string(&paths.run_summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["source"], "csv");
    }
}
