// src/data/dataset.rs - In-memory relational view over candidate participations
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::core::{
    CandidateId, CandidateIdentity, CandidateParticipation, DistrictId, Election, ElectionId,
};

/// A race is one office contested in one district over time.
pub type RaceKey = (DistrictId, String);

/// Row filter applied when a dataset is loaded (office, date range).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFilter {
    pub offices: Vec<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl DatasetFilter {
    pub fn is_active(&self) -> bool {
        !self.offices.is_empty() || self.from_date.is_some() || self.to_date.is_some()
    }

    pub fn accepts(&self, participation: &CandidateParticipation) -> bool {
        if !self.offices.is_empty() && !self.offices.iter().any(|o| o == &participation.office) {
            return false;
        }
        if self.from_date.is_some_and(|from| participation.election_date < from) {
            return false;
        }
        if self.to_date.is_some_and(|to| participation.election_date > to) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElectionDataset {
    participations: Vec<CandidateParticipation>,
    elections: BTreeMap<ElectionId, Election>,
    winners_by_election: HashMap<ElectionId, Vec<usize>>,
}

impl ElectionDataset {
    /// Builds the view. `(candidate_id, election_id)` is expected to be unique;
    /// repeated keys keep their first row.
    pub fn new(rows: Vec<CandidateParticipation>) -> Self {
        let mut seen: HashSet<(CandidateId, ElectionId)> = HashSet::with_capacity(rows.len());
        let mut participations = Vec::with_capacity(rows.len());
        let mut duplicate_rows = 0usize;
        for row in rows {
            if seen.insert((row.candidate_id, row.election_id)) {
                participations.push(row);
            } else {
                duplicate_rows += 1;
            }
        }
        if duplicate_rows > 0 {
            warn!(
                "Dropped {} repeated (candidate_id, election_id) rows while building dataset",
                duplicate_rows
            );
        }

        let mut elections = BTreeMap::new();
        let mut winners_by_election: HashMap<ElectionId, Vec<usize>> = HashMap::new();
        for (idx, p) in participations.iter().enumerate() {
            elections
                .entry(p.election_id)
                .or_insert_with(|| Election::from(p));
            if p.is_winner {
                winners_by_election.entry(p.election_id).or_default().push(idx);
            }
        }

        debug!(
            "Dataset built: {} participations, {} elections",
            participations.len(),
            elections.len()
        );

        Self {
            participations,
            elections,
            winners_by_election,
        }
    }

    pub fn filtered(rows: Vec<CandidateParticipation>, filter: &DatasetFilter) -> Self {
        if !filter.is_active() {
            return Self::new(rows);
        }
        Self::new(rows.into_iter().filter(|p| filter.accepts(p)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.participations.is_empty()
    }

    pub fn participations(&self) -> &[CandidateParticipation] {
        &self.participations
    }

    pub fn election_count(&self) -> usize {
        self.elections.len()
    }

    /// Elections grouped by race, each group ordered by date then id.
    pub fn elections_by_race(&self) -> BTreeMap<RaceKey, Vec<&Election>> {
        let mut races: BTreeMap<RaceKey, Vec<&Election>> = BTreeMap::new();
        for election in self.elections.values() {
            races
                .entry((election.district_id, election.office.clone()))
                .or_default()
                .push(election);
        }
        for elections in races.values_mut() {
            elections.sort_by_key(|e| (e.election_date, e.election_id));
        }
        races
    }

    pub fn winners_of(&self, election_id: ElectionId) -> impl Iterator<Item = &CandidateParticipation> {
        self.winners_by_election
            .get(&election_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.participations[idx])
    }

    /// One identity per candidate id: its row with the highest election id.
    /// Returned ordered by candidate id, descending.
    pub fn candidate_universe(&self) -> Vec<CandidateIdentity> {
        let mut ordered: Vec<&CandidateParticipation> = self.participations.iter().collect();
        ordered.sort_by(|a, b| {
            b.candidate_id
                .cmp(&a.candidate_id)
                .then(b.election_id.cmp(&a.election_id))
        });
        let mut universe: Vec<CandidateIdentity> = Vec::new();
        for p in ordered {
            if universe.last().map(|c| c.candidate_id) != Some(p.candidate_id) {
                universe.push(CandidateIdentity::from(p));
            }
        }
        universe
    }

    pub fn identities_by_id(&self) -> HashMap<CandidateId, CandidateIdentity> {
        self.candidate_universe()
            .into_iter()
            .map(|identity| (identity.candidate_id, identity))
            .collect()
    }

    /// Candidate ids whose participations disagree on first or last name.
    /// Reported only; the universe still takes the latest row.
    pub fn inconsistent_candidate_ids(&self) -> Vec<CandidateId> {
        let mut names: HashMap<CandidateId, (&str, &str)> = HashMap::new();
        let mut inconsistent: HashSet<CandidateId> = HashSet::new();
        for p in &self.participations {
            let current = (p.first_name.as_str(), p.last_name.as_str());
            match names.get(&p.candidate_id) {
                Some(existing) if *existing != current => {
                    inconsistent.insert(p.candidate_id);
                }
                Some(_) => {}
                None => {
                    names.insert(p.candidate_id, current);
                }
            }
        }
        let mut ids: Vec<CandidateId> = inconsistent.into_iter().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    /// Participation with sensible defaults; split the display name into first/last.
    pub fn participation(
        candidate_id: CandidateId,
        election_id: ElectionId,
        name: &str,
        district_id: DistrictId,
        election_date: NaiveDate,
    ) -> CandidateParticipation {
        let parts: Vec<&str> = name.split_whitespace().collect();
        CandidateParticipation {
            candidate_id,
            election_id,
            name: Some(name.to_string()),
            first_name: parts.first().copied().unwrap_or_default().to_string(),
            middle_name: String::new(),
            last_name: parts.last().copied().unwrap_or_default().to_string(),
            office: "State Representative".to_string(),
            district_id,
            district: format!("District {}", district_id),
            city_town: None,
            is_winner: false,
            is_incumbent: Some(false),
            election_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_universe_keeps_latest_participation_per_id() {
        let mut older = participation(5, 100, "Ann Lee", 1, date(2016, 11, 8));
        older.office = "State Senate".to_string();
        let newer = participation(5, 200, "Ann B. Lee", 1, date(2018, 11, 6));
        let other = participation(9, 150, "Bo Chan", 2, date(2016, 11, 8));

        let dataset = ElectionDataset::new(vec![older, other, newer]);
        let universe = dataset.candidate_universe();

        assert_eq!(universe.len(), 2);
        assert_eq!(universe[0].candidate_id, 9);
        assert_eq!(universe[1].candidate_id, 5);
        assert_eq!(universe[1].election_id, 200);
        assert_eq!(universe[1].name.as_deref(), Some("Ann B. Lee"));
    }

    #[test]
    fn test_repeated_keys_are_dropped() {
        let a = participation(1, 10, "Ann Lee", 1, date(2016, 11, 8));
        let dataset = ElectionDataset::new(vec![a.clone(), a]);
        assert_eq!(dataset.participations().len(), 1);
    }

    #[test]
    fn test_elections_grouped_by_race_in_date_order() {
        let p1 = participation(1, 30, "Ann Lee", 7, date(2020, 11, 3));
        let p2 = participation(2, 10, "Bo Chan", 7, date(2016, 11, 8));
        let p3 = participation(3, 20, "Cy Diaz", 8, date(2018, 11, 6));
        let dataset = ElectionDataset::new(vec![p1, p2, p3]);

        let races = dataset.elections_by_race();
        let district_7 = &races[&(7, "State Representative".to_string())];
        let ids: Vec<ElectionId> = district_7.iter().map(|e| e.election_id).collect();
        assert_eq!(ids, vec![10, 30]);
        assert_eq!(races.len(), 2);
    }

    #[test]
    fn test_winners_lookup() {
        let mut winner = participation(1, 10, "Ann Lee", 7, date(2016, 11, 8));
        winner.is_winner = true;
        let loser = participation(2, 10, "Bo Chan", 7, date(2016, 11, 8));
        let dataset = ElectionDataset::new(vec![winner, loser]);

        let winners: Vec<CandidateId> = dataset.winners_of(10).map(|p| p.candidate_id).collect();
        assert_eq!(winners, vec![1]);
        assert_eq!(dataset.winners_of(99).count(), 0);
    }

    #[test]
    fn test_filter_by_office_and_dates() {
        let mut senate = participation(1, 10, "Ann Lee", 7, date(2016, 11, 8));
        senate.office = "State Senate".to_string();
        let early = participation(2, 11, "Bo Chan", 7, date(2010, 11, 2));
        let kept = participation(3, 12, "Cy Diaz", 7, date(2018, 11, 6));
        let filter = DatasetFilter {
            offices: vec!["State Representative".to_string()],
            from_date: Some(date(2012, 1, 1)),
            to_date: None,
        };

        let dataset = ElectionDataset::filtered(vec![senate, early, kept], &filter);
        let ids: Vec<CandidateId> = dataset.participations().iter().map(|p| p.candidate_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_inconsistent_ids_reported() {
        let a = participation(1, 10, "Ann Lee", 7, date(2016, 11, 8));
        let b = participation(1, 11, "Anne Leigh", 7, date(2018, 11, 6));
        let c = participation(2, 11, "Bo Chan", 7, date(2018, 11, 6));
        let dataset = ElectionDataset::new(vec![a, b, c]);
        assert_eq!(dataset.inconsistent_candidate_ids(), vec![1]);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = ElectionDataset::new(Vec::new());
        assert!(dataset.is_empty());
        assert!(dataset.candidate_universe().is_empty());
        assert!(dataset.elections_by_race().is_empty());
    }
}
