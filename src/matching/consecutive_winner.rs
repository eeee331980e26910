// src/matching/consecutive_winner.rs - Same surname winning back-to-back elections under new ids
use chrono::NaiveDate;

use crate::data::dataset::ElectionDataset;
use crate::matching::name::names_match_with_abbreviation;
use crate::matching::DetectorRun;
use crate::models::core::{CandidateParticipation, Election};
use crate::models::matching::{Confidence, DetectionMethod, DuplicateCandidatePair};
use crate::utils::progress_bars::logging::DetectionLogger;

struct WinnerTransition<'a> {
    earlier: &'a Election,
    later: &'a Election,
    first: &'a CandidateParticipation,
    second: &'a CandidateParticipation,
}

/// Pairs of elections in one race where the second is the next one by date.
/// Several elections on the same date (specials) all count as "next".
fn consecutive_elections<'a>(race: &[&'a Election]) -> Vec<(&'a Election, &'a Election)> {
    let mut by_date: Vec<(NaiveDate, Vec<&'a Election>)> = Vec::new();
    for &election in race {
        match by_date.last_mut() {
            Some((date, group)) if *date == election.election_date => group.push(election),
            _ => by_date.push((election.election_date, vec![election])),
        }
    }

    let mut transitions = Vec::new();
    for window in by_date.windows(2) {
        for &earlier in &window[0].1 {
            for &later in &window[1].1 {
                transitions.push((earlier, later));
            }
        }
    }
    transitions
}

fn is_suspicious(transition: &WinnerTransition<'_>, recency_cutoff: NaiveDate) -> bool {
    let WinnerTransition {
        later,
        first,
        second,
        ..
    } = transition;
    first.candidate_id != second.candidate_id
        && first.last_name == second.last_name
        && first.same_city_or_unknown(second)
        && second.is_incumbent == Some(false)
        && later.election_date >= recency_cutoff
}

/// Winners of consecutive elections in the same race who share a last name,
/// where the later winner is not flagged as the incumbent. The incumbency flag
/// contradicting surname continuity suggests one person under two ids.
///
/// Results are ordered by the later election date, newest first.
pub fn find_consecutive_winner_duplicates(
    dataset: &ElectionDataset,
    recency_cutoff: NaiveDate,
) -> DetectorRun {
    let logger = DetectionLogger::new(DetectionMethod::ConsecutiveWinner);
    logger.log_start(&format!("second election on or after {}", recency_cutoff));

    let races = dataset.elections_by_race();
    logger.log_data_loaded(dataset.election_count(), "election");

    let mut candidates: Vec<WinnerTransition<'_>> = Vec::new();
    let mut transitions_checked = 0usize;
    for race in races.values() {
        for (earlier, later) in consecutive_elections(race) {
            transitions_checked += 1;
            for first in dataset.winners_of(earlier.election_id) {
                for second in dataset.winners_of(later.election_id) {
                    let transition = WinnerTransition {
                        earlier,
                        later,
                        first,
                        second,
                    };
                    if is_suspicious(&transition, recency_cutoff) {
                        candidates.push(transition);
                    }
                }
            }
        }
    }
    logger.log_pair_generation(transitions_checked, races.len());

    let raw_matches = candidates.len();
    candidates.retain(|t| names_match_with_abbreviation(t.first.name.as_deref(), t.second.name.as_deref()));
    logger.log_filtering_results(raw_matches, candidates.len());

    candidates.sort_by(|a, b| {
        b.later
            .election_date
            .cmp(&a.later.election_date)
            .then(a.first.candidate_id.cmp(&b.first.candidate_id))
            .then(a.second.candidate_id.cmp(&b.second.candidate_id))
    });

    let pairs: Vec<DuplicateCandidatePair> = candidates
        .iter()
        .map(|t| DuplicateCandidatePair {
            id_1: t.first.candidate_id,
            name_1: t.first.display_name().to_string(),
            id_2: t.second.candidate_id,
            name_2: t.second.display_name().to_string(),
            office: t.earlier.office.clone(),
            district_id: Some(t.earlier.district_id),
            detection_method: DetectionMethod::ConsecutiveWinner,
            confidence: Confidence::High,
            evidence_score: (t.later.election_date - t.earlier.election_date).num_days() as f64,
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
    use crate::utils::constants::default_recency_cutoff;

    fn winner(
        candidate_id: i64,
        election_id: i64,
        name: &str,
        district_id: i64,
        when: NaiveDate,
    ) -> CandidateParticipation {
        let mut p = participation(candidate_id, election_id, name, district_id, when);
        p.is_winner = true;
        p.district = "7th Middlesex".to_string();
        p
    }

    #[test]
    fn test_smith_re_registered_after_2018() {
        let first = winner(11, 100, "John Smith", 7, date(2018, 11, 6));
        let mut second = winner(12, 200, "John A. Smith", 7, date(2020, 11, 3));
        second.is_incumbent = Some(false);
        let loser = participation(13, 200, "Mary Jones", 7, date(2020, 11, 3));

        let dataset = ElectionDataset::new(vec![first, second, loser]);
        let run = find_consecutive_winner_duplicates(&dataset, default_recency_cutoff());

        assert_eq!(run.pairs.len(), 1);
        let pair = &run.pairs[0];
        assert_eq!((pair.id_1, pair.id_2), (11, 12));
        assert_eq!(pair.confidence, Confidence::High);
        assert_eq!(pair.detection_method, DetectionMethod::ConsecutiveWinner);
        assert_eq!(pair.district_id, Some(7));
        assert_eq!(pair.evidence_score, 728.0);
        assert_eq!(run.stats.pairs_found, 1);
    }

    #[test]
    fn test_incumbent_second_winner_is_not_suspicious() {
        let first = winner(11, 100, "John Smith", 7, date(2018, 11, 6));
        let mut second = winner(12, 200, "John Smith", 7, date(2020, 11, 3));
        second.is_incumbent = Some(true);
        let dataset = ElectionDataset::new(vec![first, second]);
        assert!(find_consecutive_winner_duplicates(&dataset, default_recency_cutoff())
            .pairs
            .is_empty());
    }

    #[test]
    fn test_blank_incumbency_flag_is_not_a_break() {
        use crate::data::csv_source::load_participations_csv;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"candidate_id,election_id,name,first_name,middle_name,last_name,office,district_id,district,city_town,is_winner,is_incumbent,election_date\n\
              11,100,John Smith,John,,Smith,State Representative,7,7th Middlesex,,1,0,2018-11-06\n\
              12,200,John A. Smith,John,A.,Smith,State Representative,7,7th Middlesex,,1,,2020-11-03\n",
        )
        .unwrap();

        let rows = load_participations_csv(file.path()).unwrap();
        assert_eq!(rows[1].is_incumbent, None);
        let dataset = ElectionDataset::new(rows);
        let run = find_consecutive_winner_duplicates(&dataset, default_recency_cutoff());
        assert!(run.pairs.is_empty());
        assert_eq!(run.stats.pairs_considered, 0);
    }

    #[test]
    fn test_only_next_election_counts() {
        // 2016 -> 2018 -> 2020; the 2016 and 2020 winners are not consecutive.
        let a = winner(11, 100, "John Smith", 7, date(2016, 11, 8));
        let b = winner(20, 150, "Ruth Brown", 7, date(2018, 11, 6));
        let c = winner(12, 200, "John Smith", 7, date(2020, 11, 3));
        let dataset = ElectionDataset::new(vec![a, b, c]);
        assert!(find_consecutive_winner_duplicates(&dataset, default_recency_cutoff())
            .pairs
            .is_empty());
    }

    #[test]
    fn test_recency_cutoff_and_city_guard() {
        let old_first = winner(11, 100, "John Smith", 7, date(2012, 11, 6));
        let old_second = winner(12, 200, "John Smith", 7, date(2014, 11, 4));

        let mut first = winner(21, 300, "Ann Lee", 8, date(2018, 11, 6));
        first.city_town = Some("Lowell".to_string());
        let mut second = winner(22, 400, "Ann Lee", 8, date(2020, 11, 3));
        second.city_town = Some("Boston".to_string());

        let dataset = ElectionDataset::new(vec![old_first, old_second, first, second]);
        let run = find_consecutive_winner_duplicates(&dataset, default_recency_cutoff());
        assert!(run.pairs.is_empty());

        let run = find_consecutive_winner_duplicates(&dataset, date(2010, 1, 1));
        let keys: Vec<_> = run.pairs.iter().map(|p| p.pair_key()).collect();
        assert_eq!(keys, vec![(11, 12)]);
    }

    #[test]
    fn test_name_filter_removes_different_first_names() {
        let first = winner(11, 100, "John Smith", 7, date(2018, 11, 6));
        let second = winner(12, 200, "Patricia Smith", 7, date(2020, 11, 3));
        let dataset = ElectionDataset::new(vec![first, second]);
        let run = find_consecutive_winner_duplicates(&dataset, default_recency_cutoff());
        assert!(run.pairs.is_empty());
        assert_eq!(run.stats.pairs_considered, 1);
    }

    #[test]
    fn test_same_day_specials_are_all_next() {
        let e1 = Election {
            election_id: 1,
            office: "State Senate".to_string(),
            district_id: 3,
            district: "3rd Essex".to_string(),
            election_date: date(2018, 11, 6),
        };
        let e2 = Election {
            election_id: 2,
            election_date: date(2019, 3, 5),
            ..e1.clone()
        };
        let e3 = Election {
            election_id: 3,
            election_date: date(2019, 3, 5),
            ..e1.clone()
        };
        let race = vec![&e1, &e2, &e3];
        let ids: Vec<(i64, i64)> = consecutive_elections(&race)
            .iter()
            .map(|(a, b)| (a.election_id, b.election_id))
            .collect();
        assert_eq!(ids, vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = ElectionDataset::new(Vec::new());
        let run = find_consecutive_winner_duplicates(&dataset, default_recency_cutoff());
        assert!(run.pairs.is_empty());
    }
}
