// src/models/stats_models.rs
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::matching::DetectionMethod;

#[derive(Debug, Clone, Serialize)]
pub struct DetectionStats {
    pub method: DetectionMethod,
    /// Comparisons or joined rows examined before the name filter.
    pub pairs_considered: usize,
    pub pairs_found: usize,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfidenceBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub description: Option<String>,
    pub source: String,
    pub total_participations: usize,
    pub total_candidates: usize,
    pub total_elections: usize,
    pub inconsistent_candidate_ids: usize,
    pub method_stats: Vec<DetectionStats>,
    pub manual_overrides: usize,
    pub merged_pairs: usize,
    pub merged_by_confidence: ConfidenceBreakdown,
    pub mapping_rows: usize,
    pub reported_duplicates: usize,
    pub load_time: f64,
    pub detection_time: f64,
    pub total_processing_time: f64,
}

impl PipelineStats {
    pub fn new(run_id: &str, run_timestamp: NaiveDateTime, source: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_timestamp,
            description: None,
            source: source.to_string(),
            total_participations: 0,
            total_candidates: 0,
            total_elections: 0,
            inconsistent_candidate_ids: 0,
            method_stats: Vec::new(),
            manual_overrides: 0,
            merged_pairs: 0,
            merged_by_confidence: ConfidenceBreakdown::default(),
            mapping_rows: 0,
            reported_duplicates: 0,
            load_time: 0.0,
            detection_time: 0.0,
            total_processing_time: 0.0,
        }
    }
}
