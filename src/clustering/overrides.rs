// src/clustering/overrides.rs - Human-confirmed pairs: manual overrides, confirmed map, reviewed spelling
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::data::csv_source::read_rows_if_present;
use crate::models::core::{CandidateId, CandidateIdentity};
use crate::models::matching::{
    pair_key, CanonicalMapping, Confidence, DetectionMethod, DuplicateCandidatePair, PairKey,
    PreferredPairReport, ReviewVerdict, SpellingCandidatePair,
};

/// Evidence recorded for pairs a person asserted directly.
const MANUAL_EVIDENCE: f64 = 100.0;
const MANUAL_RATIO: u8 = 100;

/// A known special case, e.g. one person who ran under two ids before settling
/// on a third. `pref_id` names the id to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub id_1: CandidateId,
    pub id_2: CandidateId,
    #[serde(default)]
    pub name_1: String,
    #[serde(default)]
    pub name_2: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub district_1: String,
    #[serde(default)]
    pub city_town_1: Option<String>,
    #[serde(default)]
    pub district_2: String,
    #[serde(default)]
    pub city_town_2: Option<String>,
    #[serde(default)]
    pub pref_id: Option<CandidateId>,
}

impl ManualOverride {
    /// A promoted row of the confirmed mapping; the rest of the context is
    /// filled from the candidate universe when rendered.
    fn from_confirmed(row: &CanonicalMapping) -> Self {
        Self {
            id_1: row.id_canonical,
            id_2: row.id_dup,
            name_1: row.name_canonical.clone(),
            name_2: String::new(),
            office: String::new(),
            district_1: String::new(),
            city_town_1: None,
            district_2: String::new(),
            city_town_2: None,
            pref_id: Some(row.id_canonical),
        }
    }

    fn preferred_id(&self) -> CandidateId {
        resolve_preference(self.id_1, self.id_2, self.pref_id)
    }
}

/// `pref` when it names one side of the pair, otherwise the lower id.
pub fn resolve_preference(
    id_1: CandidateId,
    id_2: CandidateId,
    pref: Option<CandidateId>,
) -> CandidateId {
    match pref {
        Some(p) if p == id_1 || p == id_2 => p,
        Some(p) => {
            warn!(
                "Preferred id {} is not part of pair ({}, {}); keeping the lower id",
                p, id_1, id_2
            );
            id_1.min(id_2)
        }
        None => id_1.min(id_2),
    }
}

/// Every human-confirmed pair that enters the merge at maximum confidence.
#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    overrides: Vec<ManualOverride>,
}

impl OverrideRegistry {
    pub fn new(rows: Vec<ManualOverride>) -> Self {
        let mut seen: HashSet<PairKey> = HashSet::new();
        let mut overrides = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in rows {
            if row.id_1 == row.id_2 {
                warn!("Ignoring manual override pairing candidate {} with itself", row.id_1);
                skipped += 1;
                continue;
            }
            if seen.insert(pair_key(row.id_1, row.id_2)) {
                overrides.push(row);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            info!("Manual override registry skipped {} self or repeated rows", skipped);
        }
        Self { overrides }
    }

    /// Reads the override list and the confirmed mapping; either may be absent.
    pub fn load(manual_csv: Option<&Path>, confirmed_csv: Option<&Path>) -> Result<Self> {
        let mut rows: Vec<ManualOverride> = read_rows_if_present(manual_csv, "manual override")
            .context("Failed to load manual overrides")?;
        let confirmed: Vec<CanonicalMapping> =
            read_rows_if_present(confirmed_csv, "confirmed id mapping")
                .context("Failed to load confirmed id mapping")?;
        rows.extend(confirmed.iter().map(ManualOverride::from_confirmed));
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Overrides as merge input: method `manual`, confidence `high`.
    pub fn to_pairs(
        &self,
        identities: &HashMap<CandidateId, CandidateIdentity>,
    ) -> Vec<DuplicateCandidatePair> {
        self.overrides
            .iter()
            .map(|o| {
                let first = identities.get(&o.id_1);
                DuplicateCandidatePair {
                    id_1: o.id_1,
                    name_1: name_or_known(&o.name_1, first),
                    id_2: o.id_2,
                    name_2: name_or_known(&o.name_2, identities.get(&o.id_2)),
                    office: if o.office.is_empty() {
                        first.map(|c| c.office.clone()).unwrap_or_default()
                    } else {
                        o.office.clone()
                    },
                    district_id: first.map(|c| c.district_id),
                    detection_method: DetectionMethod::Manual,
                    confidence: Confidence::High,
                    evidence_score: MANUAL_EVIDENCE,
                    pref_id: Some(o.preferred_id()),
                }
            })
            .collect()
    }

    /// Overrides as rows of the spelling review file, already answered `yes`.
    pub fn review_rows(
        &self,
        identities: &HashMap<CandidateId, CandidateIdentity>,
    ) -> Vec<SpellingCandidatePair> {
        self.overrides
            .iter()
            .map(|o| {
                let first = identities.get(&o.id_1);
                let second = identities.get(&o.id_2);
                SpellingCandidatePair {
                    id_1: o.id_1,
                    id_2: o.id_2,
                    name_1: name_or_known(&o.name_1, first),
                    name_2: name_or_known(&o.name_2, second),
                    office_1: text_or_known(&o.office, first.map(|c| c.office.as_str())),
                    district_id_1: first.map(|c| c.district_id),
                    district_1: text_or_known(&o.district_1, first.map(|c| c.district.as_str())),
                    city_town_1: o
                        .city_town_1
                        .clone()
                        .or_else(|| first.and_then(|c| c.city_town.clone())),
                    office_2: text_or_known(&o.office, second.map(|c| c.office.as_str())),
                    district_id_2: second.map(|c| c.district_id),
                    district_2: text_or_known(&o.district_2, second.map(|c| c.district.as_str())),
                    city_town_2: o
                        .city_town_2
                        .clone()
                        .or_else(|| second.and_then(|c| c.city_town.clone())),
                    ratio: MANUAL_RATIO,
                    same_person: Some(ReviewVerdict::Yes),
                    pref_id: Some(o.preferred_id()),
                }
            })
            .collect()
    }
}

fn name_or_known(given: &str, known: Option<&CandidateIdentity>) -> String {
    if given.is_empty() {
        known
            .and_then(|c| c.name.clone())
            .unwrap_or_default()
    } else {
        given.to_string()
    }
}

fn text_or_known(given: &str, known: Option<&str>) -> String {
    if given.is_empty() {
        known.unwrap_or_default().to_string()
    } else {
        given.to_string()
    }
}

/// A spelling row as merge input.
pub fn spelling_pair(row: &SpellingCandidatePair, confidence: Confidence) -> DuplicateCandidatePair {
    let pref_id = match row.same_person {
        Some(ReviewVerdict::Yes) => Some(resolve_preference(row.id_1, row.id_2, row.pref_id)),
        _ => None,
    };
    DuplicateCandidatePair {
        id_1: row.id_1,
        name_1: row.name_1.clone(),
        id_2: row.id_2,
        name_2: row.name_2.clone(),
        office: row.office_1.clone(),
        district_id: row.district_id_1,
        detection_method: DetectionMethod::Spelling,
        confidence,
        evidence_score: f64::from(row.ratio),
        pref_id,
    }
}

/// Detected spelling pairs split by the reviewer's verdicts.
#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    /// Reviewed `yes`, as high-confidence merge input.
    pub confirmed: Vec<DuplicateCandidatePair>,
    /// The review rows behind `confirmed`.
    pub confirmed_rows: Vec<SpellingCandidatePair>,
    /// Detected this run with no verdict yet; low confidence.
    pub unreviewed: Vec<DuplicateCandidatePair>,
    /// Reviewed `no`; suppressed from the merge whichever detector emits them.
    pub rejected: HashSet<PairKey>,
}

fn verdicts_by_key(reviewed: &[SpellingCandidatePair]) -> HashMap<PairKey, &SpellingCandidatePair> {
    let mut by_key: HashMap<PairKey, &SpellingCandidatePair> = HashMap::new();
    for row in reviewed.iter().filter(|r| r.same_person.is_some()) {
        by_key.entry(row.pair_key()).or_insert(row);
    }
    by_key
}

/// Applies a reviewed copy of the spelling file to this run's detections.
/// Verdicts survive even when the pair is no longer detected.
pub fn apply_review(
    detected: &[SpellingCandidatePair],
    reviewed: &[SpellingCandidatePair],
) -> ReviewOutcome {
    let verdicts = verdicts_by_key(reviewed);
    let mut outcome = ReviewOutcome::default();

    let mut seen: HashSet<PairKey> = HashSet::new();
    for row in reviewed {
        let key = row.pair_key();
        if !seen.insert(key) {
            continue;
        }
        match verdicts.get(&key).and_then(|r| r.same_person) {
            Some(ReviewVerdict::Yes) => {
                let row = verdicts[&key];
                outcome.confirmed.push(spelling_pair(row, Confidence::High));
                outcome.confirmed_rows.push(row.clone());
            }
            Some(ReviewVerdict::No) => {
                outcome.rejected.insert(key);
            }
            None => {}
        }
    }

    for row in detected {
        if !verdicts.contains_key(&row.pair_key()) {
            outcome.unreviewed.push(spelling_pair(row, Confidence::Low));
        }
    }

    info!(
        "Spelling review: {} confirmed, {} rejected, {} awaiting review",
        outcome.confirmed.len(),
        outcome.rejected.len(),
        outcome.unreviewed.len()
    );
    outcome
}

fn verdict_order(verdict: Option<ReviewVerdict>) -> u8 {
    match verdict {
        Some(ReviewVerdict::Yes) => 0,
        Some(ReviewVerdict::No) => 1,
        None => 2,
    }
}

/// Rows for the next review file: this run's detections with earlier verdicts
/// copied over, reviewed pairs no longer detected, and the manual rows.
/// Answered rows come first (`yes`, then `no`), unanswered last.
pub fn review_file_rows(
    detected: &[SpellingCandidatePair],
    reviewed: &[SpellingCandidatePair],
    manual_rows: &[SpellingCandidatePair],
) -> Vec<SpellingCandidatePair> {
    let verdicts = verdicts_by_key(reviewed);
    let manual_keys: HashSet<PairKey> = manual_rows.iter().map(|r| r.pair_key()).collect();
    let mut emitted: HashSet<PairKey> = HashSet::new();
    let mut rows: Vec<SpellingCandidatePair> = Vec::with_capacity(detected.len() + manual_rows.len());

    for row in detected {
        let key = row.pair_key();
        if manual_keys.contains(&key) || !emitted.insert(key) {
            continue;
        }
        let mut row = row.clone();
        if let Some(previous) = verdicts.get(&key) {
            row.same_person = previous.same_person;
            row.pref_id = previous.pref_id;
        }
        rows.push(row);
    }
    for previous in verdicts.values() {
        let key = previous.pair_key();
        if !manual_keys.contains(&key) && emitted.insert(key) {
            rows.push((*previous).clone());
        }
    }
    rows.extend(manual_rows.iter().cloned());

    rows.sort_by(|a, b| {
        verdict_order(a.same_person)
            .cmp(&verdict_order(b.same_person))
            .then(b.ratio.cmp(&a.ratio))
            .then(a.pair_key().cmp(&b.pair_key()))
    });
    rows
}

/// Re-orients a confirmed row so the `_pref` side is the identity to keep.
pub fn orient_for_report(row: &SpellingCandidatePair) -> PreferredPairReport {
    let pref = resolve_preference(row.id_1, row.id_2, row.pref_id);
    let pref_is_first = pref == row.id_1;
    let side = |first: bool| {
        if first {
            (row.id_1, &row.name_1, &row.office_1, &row.district_1, &row.city_town_1)
        } else {
            (row.id_2, &row.name_2, &row.office_2, &row.district_2, &row.city_town_2)
        }
    };
    let (id_pref, name_pref, office_pref, district_pref, city_town_pref) = side(pref_is_first);
    let (id_dup, name_dup, office_dup, district_dup, city_town_dup) = side(!pref_is_first);
    PreferredPairReport {
        id_pref,
        name_pref: name_pref.clone(),
        office_pref: office_pref.clone(),
        district_pref: district_pref.clone(),
        city_town_pref: city_town_pref.clone(),
        id_dup,
        name_dup: name_dup.clone(),
        office_dup: office_dup.clone(),
        district_dup: district_dup.clone(),
        city_town_dup: city_town_dup.clone(),
    }
}

/// Confirmed pairs oriented preferred/duplicate, one row per retired id
/// (first wins), ordered by the preferred id.
pub fn reported_duplicates(confirmed_rows: &[SpellingCandidatePair]) -> Vec<PreferredPairReport> {
    let mut seen_dups: HashSet<CandidateId> = HashSet::new();
    let mut reports: Vec<PreferredPairReport> = confirmed_rows
        .iter()
        .filter(|r| r.same_person == Some(ReviewVerdict::Yes))
        .map(orient_for_report)
        .filter(|r| seen_dups.insert(r.id_dup))
        .collect();
    reports.sort_by_key(|r| r.id_pref);
    reports
}
