pub mod consecutive_winner;
pub mod manager;
pub mod name;
pub mod same_district;
pub mod spelling;

use crate::models::matching::DuplicateCandidatePair;
use crate::models::stats_models::DetectionStats;

/// Output of one relational detector.
#[derive(Debug, Clone)]
pub struct DetectorRun {
    pub pairs: Vec<DuplicateCandidatePair>,
    pub stats: DetectionStats,
}
