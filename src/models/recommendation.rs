use serde::{Deserialize, Serialize};

use super::{CatalogItem, ItemId};

/// Which signal produced a score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Cosine similarity of TF-IDF tag vectors, in [0, 1]
    Content,
    /// Pearson correlation of rating columns, in [-1, 1]
    Collaborative,
    /// Weighted sum of the two signals (unbounded ranking score)
    Hybrid,
}

/// A ranked candidate returned by one of the recommenders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub title: String,
    pub tags: String,
    pub score: f64,
    pub source: ScoreSource,
}

impl ScoredItem {
    pub fn from_item(item: &CatalogItem, score: f64, source: ScoreSource) -> Self {
        Self {
            item_id: item.id,
            title: item.title.clone(),
            tags: item.tags.clone(),
            score,
            source,
        }
    }

    /// Same item with a new score and provenance
    pub fn rescored(self, score: f64, source: ScoreSource) -> Self {
        Self {
            score,
            source,
            ..self
        }
    }
}

/// Response body shared by every recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationList {
    pub recommendations: Vec<ScoredItem>,
}

impl From<Vec<ScoredItem>> for RecommendationList {
    fn from(recommendations: Vec<ScoredItem>) -> Self {
        Self { recommendations }
    }
}
