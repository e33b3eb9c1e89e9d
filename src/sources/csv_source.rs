use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, RatingEntry},
    sources::TableSource,
};

/// MovieLens-style CSV tables on disk
///
/// A missing file loads as an empty table so the service can start without data; a file
/// that exists but fails to parse is an error.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    movies_path: PathBuf,
    ratings_path: PathBuf,
}

impl CsvTableSource {
    pub fn new(movies_path: impl Into<PathBuf>, ratings_path: impl Into<PathBuf>) -> Self {
        Self {
            movies_path: movies_path.into(),
            ratings_path: ratings_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl TableSource for CsvTableSource {
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>> {
        read_table_blocking(self.movies_path.clone()).await
    }

    async fn load_ratings(&self) -> AppResult<Vec<RatingEntry>> {
        read_table_blocking(self.ratings_path.clone()).await
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

async fn read_table_blocking<T>(path: PathBuf) -> AppResult<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || read_table(&path))
        .await
        .map_err(|e| AppError::Internal(format!("Table load task failed: {}", e)))?
}

fn read_table<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Table file not found, loading empty table");
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| AppError::DataLoad(format!("{}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded table");

    Ok(rows)
}
