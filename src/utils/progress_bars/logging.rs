// src/utils/progress_bars/logging.rs - Logging helpers for detectors and the pipeline
use log::{error, info, warn};
use std::time::{Duration, Instant};

use crate::models::matching::DetectionMethod;
use crate::models::stats_models::DetectionStats;

#[derive(Clone)]
pub struct DetectionLogger {
    method: DetectionMethod,
    method_name: &'static str,
    method_emoji: &'static str,
    start_time: Instant,
}

impl DetectionLogger {
    pub fn new(method: DetectionMethod) -> Self {
        let (method_name, method_emoji) = match method {
            DetectionMethod::Spelling => ("SPELLING", "🔤"),
            DetectionMethod::ConsecutiveWinner => ("CONSECUTIVE", "🏆"),
            DetectionMethod::SameDistrict => ("DISTRICT", "📍"),
            DetectionMethod::Manual => ("MANUAL", "📝"),
        };
        Self {
            method,
            method_name,
            method_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, details: &str) {
        info!(
            "[{}] {} 🚀 Starting {} detection ({})",
            self.method_name,
            self.method_emoji,
            self.method_name.to_lowercase(),
            details
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.method_name,
                self.method_emoji,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.method_name,
                self.method_emoji,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Working over {} {} records",
            self.method_name, self.method_emoji, count, data_type
        );
    }

    pub fn log_pair_generation(&self, total_pairs: usize, groups_count: usize) {
        info!(
            "[{}] {} 📈 Potential pairs to evaluate: {} (from {} comparison groups)",
            self.method_name, self.method_emoji, total_pairs, groups_count
        );
    }

    pub fn log_filtering_results(&self, original_pairs: usize, remaining_pairs: usize) {
        let percent_kept = if original_pairs > 0 {
            (remaining_pairs as f64 / original_pairs as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 🎯 Name filter: {} raw → {} remaining ({:.1}% kept)",
            self.method_name, self.method_emoji, original_pairs, remaining_pairs, percent_kept
        );
    }

    pub fn log_completion(&self, pairs_found: usize) {
        info!(
            "[{}] {} 🎉 COMPLETED: {} candidate pairs in {:.2?}",
            self.method_name,
            self.method_emoji,
            pairs_found,
            self.start_time.elapsed()
        );
    }

    pub fn log_data_quality_issue(&self, issue_type: &str, count: usize) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  Data quality: {} instances of {}",
                self.method_name, self.method_emoji, count, issue_type
            );
        }
    }

    /// Snapshot for the run summary.
    pub fn stats(&self, pairs_considered: usize, pairs_found: usize) -> DetectionStats {
        DetectionStats {
            method: self.method,
            pairs_considered,
            pairs_found,
            duration_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

pub fn log_pipeline_start(run_id: &str, detector_count: usize) {
    info!("🚀 Starting candidate duplicate detection (run ID: {})", run_id);
    info!("   • {} detectors scheduled", detector_count);
}

pub fn log_pipeline_phase(phase: &str, details: Option<&str>) {
    match details {
        Some(details) => info!("🔄 Pipeline phase: {} - {}", phase, details),
        None => info!("🔄 Pipeline phase: {}", phase),
    }
}

pub fn log_pipeline_method_completed(stats: &DetectionStats) {
    info!(
        "✅ {} finished: {} pairs from {} considered in {:.2}s",
        stats.method, stats.pairs_found, stats.pairs_considered, stats.duration_secs
    );
}

pub fn log_pipeline_method_failed(method: DetectionMethod, error: &str) {
    error!("❌ {} detector failed: {}", method, error);
}

pub fn log_pipeline_completion(total_time: Duration, merged_pairs: usize, mapping_rows: usize) {
    info!("🎉 Detection pipeline completed in {:.2?}", total_time);
    info!(
        "📊 {} unique candidate id pairs, {} suggested id mappings",
        merged_pairs, mapping_rows
    );
}
