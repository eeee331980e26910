// src/matching/same_district.rs - Identical first and last names recurring in one race
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::dataset::ElectionDataset;
use crate::matching::name::names_match_with_abbreviation;
use crate::matching::DetectorRun;
use crate::models::core::{CandidateId, CandidateParticipation, DistrictId, ElectionId};
use crate::models::matching::{Confidence, DetectionMethod, DuplicateCandidatePair};
use crate::utils::progress_bars::logging::DetectionLogger;

/// Rows that may be joined: same race, same stored first and last name.
type JoinKey<'a> = (DistrictId, &'a str, &'a str, &'a str);

/// Aggregate of every joined row pair for one `(id_1, id_2)` with `id_1 < id_2`.
#[derive(Default)]
struct PairEvidence<'a> {
    elections_1: HashSet<ElectionId>,
    elections_2: HashSet<ElectionId>,
    latest_1: Option<&'a CandidateParticipation>,
    latest_2: Option<&'a CandidateParticipation>,
}

fn keep_latest<'a>(slot: &mut Option<&'a CandidateParticipation>, row: &'a CandidateParticipation) {
    if slot.map_or(true, |current| row.election_id > current.election_id) {
        *slot = Some(row);
    }
}

/// Different candidate ids whose participations share district, office,
/// first and last name (exact, as stored) with compatible cities. Each side's
/// distinct election count orders the output, most prolific first.
pub fn find_same_district_duplicates(dataset: &ElectionDataset) -> DetectorRun {
    let logger = DetectionLogger::new(DetectionMethod::SameDistrict);
    logger.log_start("exact first and last name within district and office");

    let mut groups: HashMap<JoinKey<'_>, Vec<&CandidateParticipation>> = HashMap::new();
    let mut unnamed_rows = 0usize;
    for p in dataset.participations() {
        if p.last_name.is_empty() {
            unnamed_rows += 1;
            continue;
        }
        groups
            .entry((p.district_id, p.office.as_str(), p.last_name.as_str(), p.first_name.as_str()))
            .or_default()
            .push(p);
    }
    logger.log_data_loaded(dataset.participations().len(), "participation");
    logger.log_data_quality_issue("participations without a last name", unnamed_rows);

    let mut joined: BTreeMap<(CandidateId, CandidateId), PairEvidence<'_>> = BTreeMap::new();
    let mut joined_rows = 0usize;
    for rows in groups.values() {
        for &c1 in rows {
            for &c2 in rows {
                if c1.candidate_id >= c2.candidate_id || !c1.same_city_or_unknown(c2) {
                    continue;
                }
                joined_rows += 1;
                let evidence = joined.entry((c1.candidate_id, c2.candidate_id)).or_default();
                evidence.elections_1.insert(c1.election_id);
                evidence.elections_2.insert(c2.election_id);
                keep_latest(&mut evidence.latest_1, c1);
                keep_latest(&mut evidence.latest_2, c2);
            }
        }
    }
    logger.log_pair_generation(joined_rows, groups.len());

    let raw_matches = joined.len();
    let mut scored: Vec<(usize, &CandidateParticipation, &CandidateParticipation)> = joined
        .values()
        .filter_map(|e| {
            let (c1, c2) = (e.latest_1?, e.latest_2?);
            Some((e.elections_1.len() + e.elections_2.len(), c1, c2))
        })
        .filter(|(_, c1, c2)| names_match_with_abbreviation(c1.name.as_deref(), c2.name.as_deref()))
        .collect();
    logger.log_filtering_results(raw_matches, scored.len());

    // BTreeMap iteration already gives id order, so a stable sort keeps ties by id.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let pairs: Vec<DuplicateCandidatePair> = scored
        .into_iter()
        .map(|(elections, c1, c2)| DuplicateCandidatePair {
            id_1: c1.candidate_id,
            name_1: c1.display_name().to_string(),
            id_2: c2.candidate_id,
            name_2: c2.display_name().to_string(),
            office: c1.office.clone(),
            district_id: Some(c1.district_id),
            detection_method: DetectionMethod::SameDistrict,
            confidence: Confidence::Medium,
            evidence_score: elections as f64,
            pref_id: None,
        })
        .collect();

    logger.log_completion(pairs.len());
    DetectorRun {
        stats: logger.stats(raw_matches, pairs.len()),
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::test_support::{date, participation};

    #[test]
    fn test_recurring_name_in_same_race() {
        let rows = vec![
            participation(30, 1, "Paul Donato", 4, date(2014, 11, 4)),
            participation(30, 2, "Paul Donato", 4, date(2016, 11, 8)),
            participation(45, 3, "Paul J. Donato", 4, date(2018, 11, 6)),
            participation(50, 3, "Paul Donato", 9, date(2018, 11, 6)),
        ];
        let dataset = ElectionDataset::new(rows);
        let run = find_same_district_duplicates(&dataset);

        assert_eq!(run.pairs.len(), 1);
        let pair = &run.pairs[0];
        assert_eq!((pair.id_1, pair.id_2), (30, 45));
        assert_eq!(pair.confidence, Confidence::Medium);
        assert_eq!(pair.detection_method, DetectionMethod::SameDistrict);
        assert_eq!(pair.evidence_score, 3.0);
        assert_eq!(pair.district_id, Some(4));
    }

    #[test]
    fn test_first_name_must_match_exactly() {
        let rows = vec![
            participation(1, 1, "Jo Comerford", 4, date(2018, 11, 6)),
            participation(2, 2, "Joanne Comerford", 4, date(2020, 11, 3)),
        ];
        let dataset = ElectionDataset::new(rows);
        assert!(find_same_district_duplicates(&dataset).pairs.is_empty());
    }

    #[test]
    fn test_city_conflict_and_empty_last_name_excluded() {
        let mut a = participation(1, 1, "Ann Lee", 4, date(2018, 11, 6));
        a.city_town = Some("Salem".to_string());
        let mut b = participation(2, 2, "Ann Lee", 4, date(2020, 11, 3));
        b.city_town = Some("Lynn".to_string());
        let mut c = participation(3, 1, "Cher", 4, date(2018, 11, 6));
        c.last_name = String::new();
        let mut d = participation(4, 2, "Cher", 4, date(2020, 11, 3));
        d.last_name = String::new();

        let dataset = ElectionDataset::new(vec![a, b, c, d]);
        let run = find_same_district_duplicates(&dataset);
        assert!(run.pairs.is_empty());
        assert_eq!(run.stats.pairs_considered, 0);
    }

    #[test]
    fn test_ordered_by_election_count() {
        let rows = vec![
            participation(1, 1, "Ann Lee", 4, date(2014, 11, 4)),
            participation(2, 2, "Ann Lee", 4, date(2016, 11, 8)),
            participation(5, 1, "Bo Chan", 4, date(2014, 11, 4)),
            participation(5, 2, "Bo Chan", 4, date(2016, 11, 8)),
            participation(6, 3, "Bo Chan", 4, date(2018, 11, 6)),
            participation(6, 4, "Bo Chan", 4, date(2020, 11, 3)),
        ];
        let dataset = ElectionDataset::new(rows);
        let run = find_same_district_duplicates(&dataset);
        let keys: Vec<_> = run.pairs.iter().map(|p| p.pair_key()).collect();
        assert_eq!(keys, vec![(5, 6), (1, 2)]);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = ElectionDataset::new(Vec::new());
        assert!(find_same_district_duplicates(&dataset).pairs.is_empty());
    }
}
