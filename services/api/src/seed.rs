//! Instrument catalog seeding from CSV
//!
//! The data directory holds two headerless files:
//! `instrument_categories.csv` with `title,slug` rows and `instruments.csv`
//! with `title,category title` rows. Loading is idempotent; rows already
//! present are skipped.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::{error::ApiError, repositories::CatalogRepository};

pub const CATEGORIES_FILE: &str = "instrument_categories.csv";
pub const INSTRUMENTS_FILE: &str = "instruments.csv";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed row in {file}: {source}")]
    Csv { file: &'static str, source: csv::Error },

    #[error("Failed to store catalog row: {0}")]
    Store(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRecord {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstrumentRecord {
    pub title: String,
    /// Title of the category the instrument belongs to
    pub category: String,
}

/// Rows added by one load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub instruments: usize,
}

/// Parse headerless CSV rows into records
pub fn parse_records<T: DeserializeOwned>(
    file: &'static str,
    data: &[u8],
) -> Result<Vec<T>, SeedError> {
    ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(data)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| SeedError::Csv { file, source })
}

async fn read_records<T: DeserializeOwned>(
    data_dir: &Path,
    file: &'static str,
) -> Result<Vec<T>, SeedError> {
    let path = data_dir.join(file);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|source| SeedError::Io { path, source })?;
    parse_records(file, &data)
}

/// Load categories first, then the instruments that reference them
pub async fn load_catalog(
    catalog: &CatalogRepository,
    data_dir: &Path,
) -> Result<SeedReport, SeedError> {
    let categories: Vec<CategoryRecord> = read_records(data_dir, CATEGORIES_FILE).await?;
    let instruments: Vec<InstrumentRecord> = read_records(data_dir, INSTRUMENTS_FILE).await?;

    let mut report = SeedReport::default();
    for record in &categories {
        if catalog.ensure_category(&record.title, &record.slug).await? {
            report.categories += 1;
        }
    }
    for record in &instruments {
        if catalog
            .ensure_instrument(&record.title, &record.category)
            .await?
        {
            report.instruments += 1;
        }
    }

    info!(
        categories = report.categories,
        instruments = report.instruments,
        skipped = categories.len() + instruments.len() - report.categories - report.instruments,
        "Instrument catalog loaded"
    );
    Ok(report)
}
