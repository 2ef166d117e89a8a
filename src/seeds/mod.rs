//! Seed list loading
//!
//! Seed lists are two-column CSV files exported by the link scrapers: a
//! header row, then one URL per record in the first column. Only the first
//! column is read.

use crate::SeedListError;
use std::path::Path;

/// Loads the seed URLs from a CSV file
///
/// Blank first-column cells are skipped and the remaining values are
/// trimmed. Rows may have any number of columns.
///
/// # Errors
///
/// A missing or unreadable file, malformed CSV, or a file without a single
/// URL. All of these are fatal for a run since there is nothing to crawl.
pub fn load_seed_list(path: &Path) -> Result<Vec<String>, SeedListError> {
    let path_str = path.display().to_string();

    let file = std::fs::File::open(path).map_err(|source| SeedListError::Io {
        path: path_str.clone(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| SeedListError::Csv {
            path: path_str.clone(),
            source,
        })?;

        if let Some(url) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) {
            seeds.push(url.to_string());
        }
    }

    if seeds.is_empty() {
        return Err(SeedListError::Empty(path_str));
    }

    tracing::debug!("Loaded {} seed URLs from {}", seeds.len(), path_str);
    Ok(seeds)
}
