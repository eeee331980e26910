// src/utils/constants.rs
use chrono::NaiveDate;

/// Spelling pairs are emitted only when the ratio is strictly above this.
pub const DEFAULT_SPELLING_RATIO_THRESHOLD: u8 = 90;

/// Consecutive-winner detections are limited to second elections on or after this date.
pub fn default_recency_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub const DEFAULT_CANDIDATES_CSV: &str = "data/ma_general_election_candidates_1990_2025.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_CONFIRMED_MAP_CSV: &str = "data/candidate-id-map.csv";

/// High-confidence pairs echoed to the log at the end of a run.
pub const SUMMARY_PAIR_LIMIT: usize = 20;
