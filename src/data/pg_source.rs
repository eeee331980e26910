// src/data/pg_source.rs - Participations from a materialized PostgreSQL store
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;
use tokio_postgres::Row;

use crate::data::dataset::DatasetFilter;
use crate::models::core::CandidateParticipation;
use crate::utils::db_connect::PgPool;

// Flags are cast through int so both boolean and 0/1 integer columns load.
// NULL flags stay NULL; the mapping below decides what unknown means.
const PARTICIPATIONS_QUERY: &str = "
    SELECT
      c.candidate_id::bigint AS candidate_id,
      c.election_id::bigint AS election_id,
      NULLIF(TRIM(c.name), '') AS name,
      COALESCE(c.first_name, '') AS first_name,
      COALESCE(c.middle_name, '') AS middle_name,
      COALESCE(c.last_name, '') AS last_name,
      COALESCE(e.office, '') AS office,
      e.district_id::bigint AS district_id,
      COALESCE(e.district, '') AS district,
      NULLIF(TRIM(c.city_town), '') AS city_town,
      c.is_winner::int AS is_winner,
      c.is_incumbent::int AS is_incumbent,
      e.election_date::date AS election_date
    FROM general_election e
    JOIN election_candidate c ON e.election_id = c.election_id
    WHERE ($1::text[] IS NULL OR e.office = ANY($1))
      AND ($2::date IS NULL OR e.election_date::date >= $2)
      AND ($3::date IS NULL OR e.election_date::date <= $3)
    ORDER BY c.candidate_id, c.election_id";

pub async fn load_participations_pg(
    pool: &PgPool,
    filter: &DatasetFilter,
) -> Result<Vec<CandidateParticipation>> {
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for participation load")?;

    let offices: Option<Vec<String>> = if filter.offices.is_empty() {
        None
    } else {
        Some(filter.offices.clone())
    };
    let from_date: Option<NaiveDate> = filter.from_date;
    let to_date: Option<NaiveDate> = filter.to_date;

    let rows = conn
        .query(PARTICIPATIONS_QUERY, &[&offices, &from_date, &to_date])
        .await
        .context("Failed to query election_candidate participations")?;

    let participations = rows
        .iter()
        .map(participation_from_row)
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Loaded {} candidate participations from PostgreSQL",
        participations.len()
    );
    Ok(participations)
}

/// One result row as read, before flag interpretation.
#[derive(Debug, Clone)]
struct ParticipationColumns {
    candidate_id: i64,
    election_id: i64,
    name: Option<String>,
    first_name: String,
    middle_name: String,
    last_name: String,
    office: String,
    district_id: i64,
    district: String,
    city_town: Option<String>,
    is_winner: Option<i32>,
    is_incumbent: Option<i32>,
    election_date: NaiveDate,
}

fn flag_from_column(value: Option<i32>) -> Option<bool> {
    value.map(|v| v != 0)
}

impl From<ParticipationColumns> for CandidateParticipation {
    fn from(c: ParticipationColumns) -> Self {
        Self {
            candidate_id: c.candidate_id,
            election_id: c.election_id,
            name: c.name,
            first_name: c.first_name,
            middle_name: c.middle_name,
            last_name: c.last_name,
            office: c.office,
            district_id: c.district_id,
            district: c.district,
            city_town: c.city_town,
            // An unrecorded winner flag means the candidate did not win.
            is_winner: flag_from_column(c.is_winner).unwrap_or(false),
            is_incumbent: flag_from_column(c.is_incumbent),
            election_date: c.election_date,
        }
    }
}

fn participation_from_row(row: &Row) -> Result<CandidateParticipation> {
    let candidate_id: i64 = row.try_get("candidate_id").context("candidate_id column")?;
    let election_id: i64 = row.try_get("election_id").context("election_id column")?;
    let columns = ParticipationColumns {
        candidate_id,
        election_id,
        name: row.try_get("name").context("name column")?,
        first_name: row.try_get("first_name").context("first_name column")?,
        middle_name: row.try_get("middle_name").context("middle_name column")?,
        last_name: row.try_get("last_name").context("last_name column")?,
        office: row.try_get("office").context("office column")?,
        district_id: row.try_get("district_id").context("district_id column")?,
        district: row.try_get("district").context("district column")?,
        city_town: row.try_get("city_town").context("city_town column")?,
        is_winner: row.try_get("is_winner").context("is_winner column")?,
        is_incumbent: row.try_get("is_incumbent").context("is_incumbent column")?,
        election_date: row
            .try_get("election_date")
            .with_context(|| format!("election_date for candidate {} / election {}", candidate_id, election_id))?,
    };
    Ok(columns.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::test_support::date;
    use crate::data::dataset::ElectionDataset;
    use crate::matching::consecutive_winner::find_consecutive_winner_duplicates;
    use crate::utils::constants::default_recency_cutoff;

    fn columns(candidate_id: i64, election_id: i64, name: &str, when: NaiveDate) -> ParticipationColumns {
        ParticipationColumns {
            candidate_id,
            election_id,
            name: Some(name.to_string()),
            first_name: "John".to_string(),
            middle_name: String::new(),
            last_name: "Smith".to_string(),
            office: "State Representative".to_string(),
            district_id: 7,
            district: "7th Middlesex".to_string(),
            city_town: None,
            is_winner: Some(1),
            is_incumbent: Some(0),
            election_date: when,
        }
    }

    #[test]
    fn test_flag_columns() {
        assert_eq!(flag_from_column(Some(1)), Some(true));
        assert_eq!(flag_from_column(Some(0)), Some(false));
        assert_eq!(flag_from_column(None), None);

        let mut row = columns(12, 200, "John A. Smith", date(2020, 11, 3));
        row.is_winner = None;
        row.is_incumbent = None;
        let p = CandidateParticipation::from(row);
        assert!(!p.is_winner);
        assert_eq!(p.is_incumbent, None);
        assert_eq!(p.district, "7th Middlesex");
    }

    #[test]
    fn test_null_incumbency_never_reads_as_discontinuity() {
        let first = columns(11, 100, "John Smith", date(2018, 11, 6));
        let mut second = columns(12, 200, "John A. Smith", date(2020, 11, 3));
        second.is_incumbent = None;
        let rows: Vec<CandidateParticipation> =
            vec![first.clone().into(), second.clone().into()];
        let run = find_consecutive_winner_duplicates(&ElectionDataset::new(rows), default_recency_cutoff());
        assert!(run.pairs.is_empty());

        second.is_incumbent = Some(0);
        let rows: Vec<CandidateParticipation> = vec![first.into(), second.into()];
        let run = find_consecutive_winner_duplicates(&ElectionDataset::new(rows), default_recency_cutoff());
        assert_eq!(run.pairs.len(), 1);
    }

    #[test]
    fn test_query_keeps_null_flags() {
        assert!(!PARTICIPATIONS_QUERY.contains("COALESCE(c.is_incumbent"));
        assert!(PARTICIPATIONS_QUERY.contains("c.is_incumbent::int AS is_incumbent"));
    }
}
