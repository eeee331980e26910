pub mod csv_source;
pub mod dataset;
pub mod pg_source;

use anyhow::{Context, Result};
use log::info;

use crate::models::core::CandidateParticipation;
use crate::utils::config::{DataSource, DedupConfig};
use crate::utils::db_connect;

pub use dataset::{DatasetFilter, ElectionDataset};

/// Loads participations from the configured source, with the dataset filter applied.
pub async fn load_dataset(config: &DedupConfig) -> Result<ElectionDataset> {
    let rows: Vec<CandidateParticipation> = match config.source {
        DataSource::Csv => csv_source::load_participations_csv(&config.candidates_csv)?,
        DataSource::Postgres => {
            let pool = db_connect::connect()
                .await
                .context("Failed to connect to database")?;
            let rows = pg_source::load_participations_pg(&pool, &config.filter).await?;
            let (connections, idle) = db_connect::get_pool_status(&pool);
            info!("DB pool after load: {} connections, {} idle", connections, idle);
            rows
        }
    };
    Ok(ElectionDataset::filtered(rows, &config.filter))
}
