// src/models/core.rs
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};

pub type CandidateId = i64;
pub type ElectionId = i64;
pub type DistrictId = i64;

/// One row per (candidate, election) appearance, as flattened by the ETL layer.
///
/// `candidate_id` is the identifier issued by the source system. It is stable
/// but not unique to a real person, which is exactly what the detectors look for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateParticipation {
    pub candidate_id: CandidateId,
    pub election_id: ElectionId,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub office: String,
    pub district_id: DistrictId,
    #[serde(default)]
    pub district: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub city_town: Option<String>,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_winner: bool,
    /// `None` when the source left the flag blank; only an explicit `false`
    /// counts as a break in incumbency.
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_incumbent: Option<bool>,
    #[serde(deserialize_with = "flexible_date")]
    pub election_date: NaiveDate,
}

impl CandidateParticipation {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Unknown on either side counts as a match, mirroring the SQL
    /// `(c1 = c2 OR c1 IS NULL OR c2 IS NULL)` join condition.
    pub fn same_city_or_unknown(&self, other: &CandidateParticipation) -> bool {
        city_matches_or_unknown(self.city_town.as_deref(), other.city_town.as_deref())
    }
}

pub fn city_matches_or_unknown(city_1: Option<&str>, city_2: Option<&str>) -> bool {
    match (city_1, city_2) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// The latest participation of a candidate id; the universe for spelling comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub candidate_id: CandidateId,
    pub election_id: ElectionId,
    pub name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub office: String,
    pub district_id: DistrictId,
    pub district: String,
    pub city_town: Option<String>,
}

impl From<&CandidateParticipation> for CandidateIdentity {
    fn from(p: &CandidateParticipation) -> Self {
        Self {
            candidate_id: p.candidate_id,
            election_id: p.election_id,
            name: p.name.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            office: p.office.clone(),
            district_id: p.district_id,
            district: p.district.clone(),
            city_town: p.city_town.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub election_id: ElectionId,
    pub office: String,
    pub district_id: DistrictId,
    pub district: String,
    pub election_date: NaiveDate,
}

impl From<&CandidateParticipation> for Election {
    fn from(p: &CandidateParticipation) -> Self {
        Self {
            election_id: p.election_id,
            office: p.office.clone(),
            district_id: p.district_id,
            district: p.district.clone(),
            election_date: p.election_date,
        }
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

// Flattened exports write booleans as 0/1, 1.0/0.0 or True/False depending on the tool.
// A blank winner cell means the candidate did not win.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(false);
    }
    parse_flag(&raw).ok_or_else(|| de::Error::custom(format!("invalid boolean flag '{}'", raw)))
}

fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_flag(value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean flag '{}'", value))),
    }
}

/// Recognized spellings of a boolean flag; blank and anything else is `None`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_election_date(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid election date '{}'", raw)))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
pub fn parse_election_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
