use crate::{
    error::AppResult,
    models::{CatalogItem, RatingEntry},
    sources::TableSource,
};

/// Fixed tables held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    catalog: Vec<CatalogItem>,
    ratings: Vec<RatingEntry>,
}

impl InMemorySource {
    pub fn new(catalog: Vec<CatalogItem>, ratings: Vec<RatingEntry>) -> Self {
        Self { catalog, ratings }
    }
}

#[async_trait::async_trait]
impl TableSource for InMemorySource {
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>> {
        Ok(self.catalog.clone())
    }

    async fn load_ratings(&self) -> AppResult<Vec<RatingEntry>> {
        Ok(self.ratings.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
