// src/utils/config.rs - Run configuration from environment variables
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use crate::data::dataset::DatasetFilter;
use crate::matching::spelling::BlockingStrategy;
use crate::models::core::parse_election_date;
use crate::models::matching::DetectionMethod;
use crate::utils::constants::{
    default_recency_cutoff, DEFAULT_CANDIDATES_CSV, DEFAULT_CONFIRMED_MAP_CSV,
    DEFAULT_OUTPUT_DIR, DEFAULT_SPELLING_RATIO_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Csv,
    Postgres,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Csv => "csv",
            DataSource::Postgres => "postgres",
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(DataSource::Csv),
            "postgres" | "postgresql" | "pg" => Ok(DataSource::Postgres),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Which detectors run and with what parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    pub enabled: BTreeSet<DetectionMethod>,
    pub spelling_threshold: u8,
    pub recency_cutoff: NaiveDate,
    pub blocking: BlockingStrategy,
    pub spelling_shards: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: DetectionMethod::DETECTORS.into_iter().collect(),
            spelling_threshold: DEFAULT_SPELLING_RATIO_THRESHOLD,
            recency_cutoff: default_recency_cutoff(),
            blocking: BlockingStrategy::None,
            spelling_shards: num_cpus::get().max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupConfig {
    pub source: DataSource,
    pub candidates_csv: PathBuf,
    pub output_dir: PathBuf,
    pub manual_overrides_csv: Option<PathBuf>,
    pub confirmed_map_csv: Option<PathBuf>,
    pub reviewed_spelling_csv: Option<PathBuf>,
    pub filter: DatasetFilter,
    pub detection: DetectionConfig,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Csv,
            candidates_csv: PathBuf::from(DEFAULT_CANDIDATES_CSV),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            manual_overrides_csv: None,
            confirmed_map_csv: Some(PathBuf::from(DEFAULT_CONFIRMED_MAP_CSV)),
            reviewed_spelling_csv: None,
            filter: DatasetFilter::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl DedupConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults and
    /// unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let source = parse_or(get("DEDUPE_SOURCE"), "DEDUPE_SOURCE", defaults.source);
        let candidates_csv = get("CANDIDATES_CSV")
            .map(PathBuf::from)
            .unwrap_or(defaults.candidates_csv);
        let output_dir = get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir);
        let manual_overrides_csv = get("MANUAL_OVERRIDES_CSV")
            .map(PathBuf::from)
            .or(defaults.manual_overrides_csv);
        let confirmed_map_csv = get("CONFIRMED_MAP_CSV")
            .map(PathBuf::from)
            .or(defaults.confirmed_map_csv);
        let reviewed_spelling_csv = get("REVIEWED_SPELLING_CSV")
            .map(PathBuf::from)
            .or(defaults.reviewed_spelling_csv);

        let filter = DatasetFilter {
            offices: get("DEDUPE_OFFICES")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            from_date: date_or_none(get("DEDUPE_FROM_DATE"), "DEDUPE_FROM_DATE"),
            to_date: date_or_none(get("DEDUPE_TO_DATE"), "DEDUPE_TO_DATE"),
        };

        let enabled = match get("DETECTORS") {
            Some(raw) => match parse_detectors(&raw) {
                Ok(set) => set,
                Err(e) => {
                    warn!("Ignoring DETECTORS='{}': {}", raw, e);
                    defaults.detection.enabled.clone()
                }
            },
            None => defaults.detection.enabled.clone(),
        };

        let detection = DetectionConfig {
            enabled,
            spelling_threshold: parse_or(
                get("SPELLING_RATIO_THRESHOLD"),
                "SPELLING_RATIO_THRESHOLD",
                defaults.detection.spelling_threshold,
            )
            .min(100),
            recency_cutoff: date_or_none(get("RECENCY_CUTOFF"), "RECENCY_CUTOFF")
                .unwrap_or(defaults.detection.recency_cutoff),
            blocking: parse_or(
                get("SPELLING_BLOCKING"),
                "SPELLING_BLOCKING",
                defaults.detection.blocking,
            ),
            spelling_shards: parse_or(
                get("SPELLING_SHARDS"),
                "SPELLING_SHARDS",
                defaults.detection.spelling_shards,
            )
            .max(1),
        };

        Self {
            source,
            candidates_csv,
            output_dir,
            manual_overrides_csv,
            confirmed_map_csv,
            reviewed_spelling_csv,
            filter,
            detection,
        }
    }

    pub fn log_config(&self) {
        info!("🔧 Run configuration:");
        match self.source {
            DataSource::Csv => info!("   • Source: csv ({})", self.candidates_csv.display()),
            DataSource::Postgres => info!("   • Source: postgres"),
        }
        info!("   • Output directory: {}", self.output_dir.display());
        let detectors: Vec<&str> = self.detection.enabled.iter().map(|m| m.as_str()).collect();
        info!("   • Detectors: {}", detectors.join(", "));
        info!(
            "   • Spelling: ratio > {}, blocking={}, shards={}",
            self.detection.spelling_threshold,
            self.detection.blocking,
            self.detection.spelling_shards
        );
        info!("   • Consecutive winners since {}", self.detection.recency_cutoff);
        if self.filter.is_active() {
            info!("   • Dataset filter: {:?}", self.filter);
        }
    }
}

/// Comma separated detector names; `manual` is not a detector and is rejected.
pub fn parse_detectors(raw: &str) -> Result<BTreeSet<DetectionMethod>, String> {
    let mut enabled = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let method: DetectionMethod = part.parse()?;
        if method == DetectionMethod::Manual {
            return Err("manual overrides are not a detector".to_string());
        }
        enabled.insert(method);
    }
    if enabled.is_empty() {
        return Err("no detectors listed".to_string());
    }
    Ok(enabled)
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring {}='{}': {}", key, value, e);
                default
            }
        },
    }
}

fn date_or_none(raw: Option<String>, key: &str) -> Option<NaiveDate> {
    let value = raw?;
    let parsed = parse_election_date(&value);
    if parsed.is_none() {
        warn!("Ignoring {}='{}': expected YYYY-MM-DD", key, value);
    }
    parsed
}
