// src/data/csv_source.rs - Flattened CSV tables produced by the ETL layer
use anyhow::{Context, Result};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::models::core::CandidateParticipation;

/// Reads every row of a headed CSV file into `T`.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        // +2: one for the header line, one for 1-based numbering.
        let row = record.with_context(|| {
            format!("Failed to parse row {} of {}", idx + 2, path.display())
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Like [`read_rows`], but a missing path or file yields no rows.
pub fn read_rows_if_present<T: DeserializeOwned>(path: Option<&Path>, label: &str) -> Result<Vec<T>> {
    match path {
        None => Ok(Vec::new()),
        Some(p) if !p.exists() => {
            info!("No {} file at {}, continuing without it", label, p.display());
            Ok(Vec::new())
        }
        Some(p) => {
            let rows = read_rows(p)?;
            info!("Loaded {} {} rows from {}", rows.len(), label, p.display());
            Ok(rows)
        }
    }
}

pub fn load_participations_csv(path: &Path) -> Result<Vec<CandidateParticipation>> {
    info!("Loading candidate participations from {}", path.display());
    let rows: Vec<CandidateParticipation> = read_rows(path)
        .context("Failed to load candidate participation table")?;
    if rows.is_empty() {
        warn!("Candidate participation table {} has no rows", path.display());
    }
    Ok(rows)
}
