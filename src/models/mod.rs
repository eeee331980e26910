pub mod core;
pub mod matching;
pub mod stats_models;

pub use self::core::{
    CandidateId, CandidateIdentity, CandidateParticipation, DistrictId, Election, ElectionId,
};
pub use self::matching::{
    CanonicalMapping, Confidence, DetectionMethod, DuplicateCandidatePair, PairKey,
    PreferredPairReport, ReviewVerdict, SpellingCandidatePair,
};
