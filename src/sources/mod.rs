//! Table sources feeding the recommendation engine
//!
//! The engine only ever sees two in-memory tables. Where they come from (CSV files on disk,
//! fixed fixtures in tests) is decided by the `TableSource` handed to the application state.

use crate::{
    error::AppResult,
    models::{CatalogItem, RatingEntry},
};

pub mod csv_source;
pub mod memory;

pub use csv_source::CsvTableSource;
pub use memory::InMemorySource;

/// Supplier of the catalog and rating tables
///
/// Catalog order is significant: it defines the rows of the content similarity matrix.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TableSource: Send + Sync {
    /// Loads every catalog record in table order
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>>;

    /// Loads every rating in table order
    async fn load_ratings(&self) -> AppResult<Vec<RatingEntry>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}
