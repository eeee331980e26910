// src/models/matching.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::core::{CandidateId, DistrictId};

/// Unordered pair key: `(min(id_1, id_2), max(id_1, id_2))`.
pub type PairKey = (CandidateId, CandidateId);

pub fn pair_key(id_1: CandidateId, id_2: CandidateId) -> PairKey {
    if id_1 <= id_2 {
        (id_1, id_2)
    } else {
        (id_2, id_1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Spelling,
    ConsecutiveWinner,
    SameDistrict,
    Manual,
}

impl DetectionMethod {
    pub const DETECTORS: [DetectionMethod; 3] = [
        DetectionMethod::Spelling,
        DetectionMethod::ConsecutiveWinner,
        DetectionMethod::SameDistrict,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Spelling => "spelling",
            DetectionMethod::ConsecutiveWinner => "consecutive_winner",
            DetectionMethod::SameDistrict => "same_district",
            DetectionMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "spelling" => Ok(DetectionMethod::Spelling),
            "consecutive_winner" => Ok(DetectionMethod::ConsecutiveWinner),
            "same_district" => Ok(DetectionMethod::SameDistrict),
            "manual" => Ok(DetectionMethod::Manual),
            other => Err(format!("unknown detection method '{}'", other)),
        }
    }
}

/// Reliability tier of a detection. Variant order is the ranking order, so a
/// new tier is inserted by position rather than by renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn rank(self) -> u8 {
        match self {
            Confidence::Low => 0,
            Confidence::Medium => 1,
            Confidence::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single duplicate claim produced by a detector or the override registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidatePair {
    pub id_1: CandidateId,
    pub name_1: String,
    pub id_2: CandidateId,
    pub name_2: String,
    pub office: String,
    pub district_id: Option<DistrictId>,
    pub detection_method: DetectionMethod,
    pub confidence: Confidence,
    /// Method specific: similarity ratio, days between elections, election count.
    pub evidence_score: f64,
    /// Explicit canonical choice from a human source, when there is one.
    pub pref_id: Option<CandidateId>,
}

impl DuplicateCandidatePair {
    pub fn pair_key(&self) -> PairKey {
        pair_key(self.id_1, self.id_2)
    }

    pub fn involves(&self, candidate_id: CandidateId) -> bool {
        self.id_1 == candidate_id || self.id_2 == candidate_id
    }

    pub fn name_of(&self, candidate_id: CandidateId) -> Option<&str> {
        if self.id_1 == candidate_id {
            Some(&self.name_1)
        } else if self.id_2 == candidate_id {
            Some(&self.name_2)
        } else {
            None
        }
    }

    /// `"<method> - <confidence> confidence"`, the provenance note of a mapping row.
    pub fn note(&self) -> String {
        format!("{} - {} confidence", self.detection_method, self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVerdict {
    Yes,
    No,
}

impl FromStr for ReviewVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Ok(ReviewVerdict::Yes),
            "no" | "n" | "false" | "0" => Ok(ReviewVerdict::No),
            other => Err(format!("unrecognised same_person value '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for ReviewVerdict {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Spelling pair with both sides' context, written out for manual review.
/// The reviewer fills `same_person` and `pref_id` and feeds the file back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingCandidatePair {
    pub id_1: CandidateId,
    pub id_2: CandidateId,
    pub name_1: String,
    pub name_2: String,
    #[serde(default)]
    pub office_1: String,
    #[serde(default)]
    pub district_id_1: Option<DistrictId>,
    #[serde(default)]
    pub district_1: String,
    #[serde(default)]
    pub city_town_1: Option<String>,
    #[serde(default)]
    pub office_2: String,
    #[serde(default)]
    pub district_id_2: Option<DistrictId>,
    #[serde(default)]
    pub district_2: String,
    #[serde(default)]
    pub city_town_2: Option<String>,
    pub ratio: u8,
    #[serde(default, deserialize_with = "optional_verdict")]
    pub same_person: Option<ReviewVerdict>,
    #[serde(default)]
    pub pref_id: Option<CandidateId>,
}

impl SpellingCandidatePair {
    pub fn pair_key(&self) -> PairKey {
        pair_key(self.id_1, self.id_2)
    }
}

fn optional_verdict<'de, D>(deserializer: D) -> Result<Option<ReviewVerdict>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A confirmed pair re-oriented so the `_pref` side is the identity to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredPairReport {
    pub id_pref: CandidateId,
    pub name_pref: String,
    pub office_pref: String,
    pub district_pref: String,
    pub city_town_pref: Option<String>,
    pub id_dup: CandidateId,
    pub name_dup: String,
    pub office_dup: String,
    pub district_dup: String,
    pub city_town_dup: Option<String>,
}

/// Final output row: retire `id_dup` in favour of `id_canonical`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMapping {
    pub id_dup: CandidateId,
    pub id_canonical: CandidateId,
    pub name_canonical: String,
    #[serde(default)]
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering_matches_rank() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::High.rank(), 2);
        assert_eq!(Confidence::Medium.rank(), 1);
    }

    #[test]
    fn test_pair_key_is_unordered() {
        assert_eq!(pair_key(7, 3), (3, 7));
        assert_eq!(pair_key(3, 7), (3, 7));
    }

    #[test]
    fn test_note_format() {
        let pair = DuplicateCandidatePair {
            id_1: 1,
            name_1: "A".into(),
            id_2: 2,
            name_2: "B".into(),
            office: "State Rep".into(),
            district_id: Some(10),
            detection_method: DetectionMethod::ConsecutiveWinner,
            confidence: Confidence::High,
            evidence_score: 728.0,
            pref_id: None,
        };
        assert_eq!(pair.note(), "consecutive_winner - high confidence");
    }

    #[test]
    fn test_detection_method_parsing() {
        assert_eq!("same-district".parse(), Ok(DetectionMethod::SameDistrict));
        assert_eq!(" Spelling ".parse(), Ok(DetectionMethod::Spelling));
        assert!("phonetic".parse::<DetectionMethod>().is_err());
    }

    #[test]
    fn test_review_verdict_parsing() {
        assert_eq!("Yes".parse(), Ok(ReviewVerdict::Yes));
        assert_eq!("no".parse(), Ok(ReviewVerdict::No));
        assert!("perhaps".parse::<ReviewVerdict>().is_err());
    }
}
