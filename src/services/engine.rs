use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::RecommendError,
    models::{CatalogItem, ItemId, RatingEntry, ScoredItem},
    services::{
        catalog_index::CatalogIndex,
        collaborative::{CollaborativeRecommender, CorrelationMode, RatingMatrix},
        content::ContentRecommender,
        deadline::Deadline,
        hybrid::{BlendWeights, HybridBlender},
    },
};

/// Knobs shared by every engine a process builds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineSettings {
    pub correlation: CorrelationMode,
    /// Budget for one recommendation call, `None` for unbounded
    pub timeout: Option<Duration>,
}

/// Snapshot of what an engine was built from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineStats {
    pub items: usize,
    pub ratings: usize,
    pub indexed: bool,
    pub vocabulary_size: Option<usize>,
    pub built_at: Option<DateTime<Utc>>,
    pub correlation_mode: CorrelationMode,
}

/// Recommendation core over one immutable snapshot of the catalog and rating tables
///
/// Every public entry point returns an empty list instead of an error: unknown items,
/// missing rating variance, numerical failures and expired deadlines are logged here and
/// the fallback decision is left to the caller.
pub struct RecommendationEngine {
    catalog: Vec<CatalogItem>,
    ratings: Vec<RatingEntry>,
    settings: EngineSettings,
    index: OnceLock<CatalogIndex>,
}

impl RecommendationEngine {
    /// Creates an engine whose content index is built on first use
    pub fn new(catalog: Vec<CatalogItem>, ratings: Vec<RatingEntry>, settings: EngineSettings) -> Self {
        Self {
            catalog,
            ratings,
            settings,
            index: OnceLock::new(),
        }
    }

    /// Creates an engine and builds its content index immediately
    pub fn with_index(
        catalog: Vec<CatalogItem>,
        ratings: Vec<RatingEntry>,
        settings: EngineSettings,
    ) -> Self {
        let engine = Self::new(catalog, ratings, settings);
        engine.index();
        engine
    }

    fn index(&self) -> &CatalogIndex {
        if let Some(index) = self.index.get() {
            return index;
        }
        tracing::debug!(reason = %RecommendError::NotIndexed, "Building content index on demand");
        self.index.get_or_init(|| CatalogIndex::build(&self.catalog))
    }

    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Catalog record for an id; the first occurrence wins for duplicated ids
    pub fn item(&self, item_id: ItemId) -> Option<&CatalogItem> {
        self.catalog.iter().find(|item| item.id == item_id)
    }

    pub fn stats(&self) -> EngineStats {
        let index = self.index.get();
        EngineStats {
            items: self.catalog.len(),
            ratings: self.ratings.len(),
            indexed: index.is_some(),
            vocabulary_size: index.map(CatalogIndex::vocabulary_size),
            built_at: index.map(CatalogIndex::built_at),
            correlation_mode: self.settings.correlation,
        }
    }

    /// Items ranked by tag similarity to `item_id`
    pub fn content_recommend(&self, item_id: ItemId, k: usize) -> Vec<ScoredItem> {
        let index = self.index();
        let deadline = self.deadline();
        settle(
            "content",
            item_id,
            ContentRecommender::new(index).recommend(item_id, k, &deadline),
        )
    }

    /// Items ranked by rating correlation with `item_id`
    pub fn collaborative_recommend(&self, item_id: ItemId, k: usize) -> Vec<ScoredItem> {
        let deadline = self.deadline();
        settle(
            "collaborative",
            item_id,
            self.collaborative().recommend(item_id, k, &deadline),
        )
    }

    /// Items ranked by the weighted sum of both signals
    pub fn hybrid_recommend(
        &self,
        item_id: ItemId,
        k: usize,
        weight_content: f64,
        weight_collab: f64,
    ) -> Vec<ScoredItem> {
        let index = self.index();
        let deadline = self.deadline();
        let weights = BlendWeights {
            content: weight_content,
            collaborative: weight_collab,
        };
        let blender = HybridBlender::new(ContentRecommender::new(index), self.collaborative());
        settle(
            "hybrid",
            item_id,
            blender.recommend(item_id, k, weights, &deadline),
        )
    }

    /// Tag cosine similarity between two catalog items
    pub fn content_similarity(&self, a: ItemId, b: ItemId) -> Option<f64> {
        self.index().similarity(a, b)
    }

    /// Rating correlation between two items under the configured mode
    pub fn collaborative_similarity(&self, a: ItemId, b: ItemId) -> Option<f64> {
        RatingMatrix::from_ratings(&self.ratings).correlation(a, b, self.settings.correlation)
    }

    fn collaborative(&self) -> CollaborativeRecommender<'_> {
        CollaborativeRecommender::new(&self.catalog, &self.ratings, self.settings.correlation)
    }

    fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.settings.timeout)
    }
}

/// Logs a degraded outcome and collapses it to an empty ranking
fn settle(
    signal: &'static str,
    item_id: ItemId,
    result: Result<Vec<ScoredItem>, RecommendError>,
) -> Vec<ScoredItem> {
    match result {
        Ok(items) => {
            tracing::debug!(signal, item_id, count = items.len(), "Recommendations ranked");
            items
        }
        Err(e) if e.is_expected() => {
            tracing::debug!(signal, item_id, reason = %e, "No recommendations");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(signal, item_id, error = %e, "Recommendation degraded to empty result");
            Vec::new()
        }
    }
}
