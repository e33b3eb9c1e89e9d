use serde::{Deserialize, Serialize};

/// Catalog identifier of a movie (`movieId` in the source tables)
pub type ItemId = i64;

/// Identifier of a rating user (`userId` in the source tables)
pub type UserId = i64;

/// A single catalog record
///
/// The serde names follow the `movies.csv` header (`movieId,title,genres`), so the same
/// type is used for table loading and for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    #[serde(rename = "movieId")]
    pub id: ItemId,
    pub title: String,
    /// Raw categorical field, e.g. `Action|Adventure`. Missing values load as `""`.
    #[serde(rename = "genres", default)]
    pub tags: String,
}

impl CatalogItem {
    pub fn new(id: ItemId, title: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            tags: tags.into(),
        }
    }
}

/// A single user rating (`userId,movieId,rating,timestamp`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingEntry {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "movieId")]
    pub item_id: ItemId,
    #[serde(rename = "rating")]
    pub value: f64,
    #[serde(default)]
    pub timestamp: i64,
}

impl RatingEntry {
    pub fn new(user_id: UserId, item_id: ItemId, value: f64) -> Self {
        Self {
            user_id,
            item_id,
            value,
            timestamp: 0,
        }
    }
}
