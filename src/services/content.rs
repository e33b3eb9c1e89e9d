use crate::{
    error::RecommendError,
    models::{ItemId, ScoreSource, ScoredItem},
    services::{catalog_index::CatalogIndex, deadline::Deadline},
};

/// Nearest neighbours by tag similarity
pub struct ContentRecommender<'a> {
    index: &'a CatalogIndex,
}

impl<'a> ContentRecommender<'a> {
    pub fn new(index: &'a CatalogIndex) -> Self {
        Self { index }
    }

    /// Top `k` items most similar to `item_id`
    ///
    /// Ranked by descending similarity with ties in catalog order. The reference item is
    /// filtered out by row and by id rather than assumed to sort first, so duplicates of it
    /// and other items with a perfect score cannot displace the wrong entry. Each id appears
    /// at most once, scored from its first catalog row.
    pub fn recommend(
        &self,
        item_id: ItemId,
        k: usize,
        deadline: &Deadline,
    ) -> Result<Vec<ScoredItem>, RecommendError> {
        let row = self
            .index
            .row_index_of(item_id)
            .ok_or(RecommendError::UnknownItem(item_id))?;
        let similarities = self
            .index
            .matrix()
            .row(row)
            .ok_or_else(|| RecommendError::ComputationFailure(format!("missing row {row}")))?;

        deadline.check()?;

        let mut ranked: Vec<(usize, f64)> = similarities
            .iter()
            .copied()
            .enumerate()
            .filter(|&(col, _)| col != row)
            .filter(|&(col, _)| {
                // Later rows of a duplicated id are unreachable; the first row speaks for it
                self.index.item_at(col).is_some_and(|candidate| {
                    candidate.id != item_id && self.index.row_index_of(candidate.id) == Some(col)
                })
            })
            .collect();

        // Stable: equal scores stay in row order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        deadline.check()?;

        Ok(ranked
            .into_iter()
            .filter_map(|(col, score)| {
                self.index
                    .item_at(col)
                    .map(|item| ScoredItem::from_item(item, score, ScoreSource::Content))
            })
            .collect())
    }
}
