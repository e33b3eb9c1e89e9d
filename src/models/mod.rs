mod catalog;
mod recommendation;

pub use catalog::{CatalogItem, ItemId, RatingEntry, UserId};
pub use recommendation::{RecommendationList, ScoreSource, ScoredItem};
