use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    error::RecommendError,
    models::{CatalogItem, ItemId, RatingEntry, ScoreSource, ScoredItem, UserId},
    services::deadline::Deadline,
};

/// Columns correlated between deadline checks
const DEADLINE_STRIDE: usize = 256;

/// Sums of squares at or below this are treated as zero variance
const VARIANCE_EPSILON: f64 = 1e-12;

/// How unrated (user, item) cells enter the correlation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Every user counts; a missing rating is a 0
    #[default]
    ZeroFilled,
    /// Only users who rated both items count
    PairwiseComplete,
}

/// Sparse user×item rating matrix stored by column
///
/// Ordered maps keep summation order fixed, so repeated queries over the same table produce
/// bit-identical scores.
#[derive(Debug, Clone, Default)]
pub struct RatingMatrix {
    columns: BTreeMap<ItemId, BTreeMap<UserId, f64>>,
    users: BTreeSet<UserId>,
}

impl RatingMatrix {
    /// Pivots ratings into columns; the last rating seen for a (user, item) pair wins
    pub fn from_ratings(ratings: &[RatingEntry]) -> Self {
        let mut matrix = Self::default();
        for rating in ratings {
            matrix
                .columns
                .entry(rating.item_id)
                .or_default()
                .insert(rating.user_id, rating.value);
            matrix.users.insert(rating.user_id);
        }
        matrix
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, item_id: ItemId) -> Option<&BTreeMap<UserId, f64>> {
        self.columns.get(&item_id)
    }

    /// Pearson correlation between two item columns, `None` when undefined
    pub fn correlation(&self, a: ItemId, b: ItemId, mode: CorrelationMode) -> Option<f64> {
        let (a, b) = (self.columns.get(&a)?, self.columns.get(&b)?);
        match mode {
            CorrelationMode::ZeroFilled => {
                let users = self.user_count();
                zero_filled_pearson(&ColumnStats::zero_filled(a, users)?, a, b, users)
            }
            CorrelationMode::PairwiseComplete => pairwise_pearson(a, b),
        }
    }
}

/// Moments of a column over the full, zero-filled user dimension
#[derive(Debug, Clone, Copy)]
struct ColumnStats {
    sum: f64,
    /// Sum of squared deviations from the mean
    centered: f64,
}

impl ColumnStats {
    fn zero_filled(column: &BTreeMap<UserId, f64>, users: usize) -> Option<Self> {
        if users == 0 {
            return None;
        }
        let sum: f64 = column.values().sum();
        let mean = sum / users as f64;
        let observed: f64 = column.values().map(|v| (v - mean).powi(2)).sum();
        let unobserved = (users - column.len()) as f64 * mean * mean;
        Some(Self {
            sum,
            centered: observed + unobserved,
        })
    }
}

fn zero_filled_pearson(
    reference: &ColumnStats,
    reference_column: &BTreeMap<UserId, f64>,
    other: &BTreeMap<UserId, f64>,
    users: usize,
) -> Option<f64> {
    let other_stats = ColumnStats::zero_filled(other, users)?;
    if reference.centered <= VARIANCE_EPSILON || other_stats.centered <= VARIANCE_EPSILON {
        return None;
    }

    // Zero cells contribute nothing to the cross product
    let (small, large) = if reference_column.len() <= other.len() {
        (reference_column, other)
    } else {
        (other, reference_column)
    };
    let dot: f64 = small
        .iter()
        .filter_map(|(user, x)| large.get(user).map(|y| x * y))
        .sum();

    let covariance = dot - reference.sum * other_stats.sum / users as f64;
    let correlation = covariance / (reference.centered * other_stats.centered).sqrt();
    correlation.is_finite().then(|| correlation.clamp(-1.0, 1.0))
}

fn pairwise_pearson(a: &BTreeMap<UserId, f64>, b: &BTreeMap<UserId, f64>) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|(user, x)| b.get(user).map(|y| (*x, *y)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        covariance += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x <= VARIANCE_EPSILON || var_y <= VARIANCE_EPSILON {
        return None;
    }

    let correlation = covariance / (var_x * var_y).sqrt();
    correlation.is_finite().then(|| correlation.clamp(-1.0, 1.0))
}

/// Whether the reference column varies enough to correlate against
fn has_variance(column: &BTreeMap<UserId, f64>, users: usize, mode: CorrelationMode) -> bool {
    match mode {
        CorrelationMode::ZeroFilled => users >= 2
            && ColumnStats::zero_filled(column, users)
                .is_some_and(|stats| stats.centered > VARIANCE_EPSILON),
        CorrelationMode::PairwiseComplete => {
            if column.len() < 2 {
                return false;
            }
            let mean = column.values().sum::<f64>() / column.len() as f64;
            column.values().map(|v| (v - mean).powi(2)).sum::<f64>() > VARIANCE_EPSILON
        }
    }
}

/// Item-to-item recommendations from co-rating patterns
///
/// Holds borrowed tables only; the rating matrix is rebuilt on every call.
pub struct CollaborativeRecommender<'a> {
    items: &'a [CatalogItem],
    ratings: &'a [RatingEntry],
    mode: CorrelationMode,
}

impl<'a> CollaborativeRecommender<'a> {
    pub fn new(items: &'a [CatalogItem], ratings: &'a [RatingEntry], mode: CorrelationMode) -> Self {
        Self {
            items,
            ratings,
            mode,
        }
    }

    /// Top `k` catalog items by rating correlation with `item_id`
    ///
    /// Ties are ordered by ascending item id. Rated items missing from the catalog are
    /// skipped before truncation.
    pub fn recommend(
        &self,
        item_id: ItemId,
        k: usize,
        deadline: &Deadline,
    ) -> Result<Vec<ScoredItem>, RecommendError> {
        let mut catalog: HashMap<ItemId, &CatalogItem> = HashMap::with_capacity(self.items.len());
        for item in self.items {
            catalog.entry(item.id).or_insert(item);
        }
        if !catalog.contains_key(&item_id) {
            return Err(RecommendError::UnknownItem(item_id));
        }

        let matrix = RatingMatrix::from_ratings(self.ratings);
        deadline.check()?;

        let users = matrix.user_count();
        let reference = matrix
            .column(item_id)
            .ok_or(RecommendError::InsufficientVariance(item_id))?;
        if reference.values().any(|v| !v.is_finite()) {
            return Err(RecommendError::ComputationFailure(format!(
                "non-finite rating for item {item_id}"
            )));
        }
        if !has_variance(reference, users, self.mode) {
            return Err(RecommendError::InsufficientVariance(item_id));
        }

        let reference_stats = ColumnStats::zero_filled(reference, users)
            .ok_or(RecommendError::InsufficientVariance(item_id))?;

        let mut ranked: Vec<(ItemId, f64)> = Vec::new();
        for (position, (&other_id, column)) in matrix.columns.iter().enumerate() {
            if position % DEADLINE_STRIDE == 0 {
                deadline.check()?;
            }
            if other_id == item_id || !catalog.contains_key(&other_id) {
                continue;
            }
            let correlation = match self.mode {
                CorrelationMode::ZeroFilled => {
                    zero_filled_pearson(&reference_stats, reference, column, users)
                }
                CorrelationMode::PairwiseComplete => pairwise_pearson(reference, column),
            };
            if let Some(correlation) = correlation {
                ranked.push((other_id, correlation));
            }
        }

        // Columns are visited in id order, so the stable sort breaks ties by id
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        tracing::debug!(
            item_id,
            users,
            items = matrix.item_count(),
            candidates = ranked.len(),
            "Correlated rating columns"
        );

        Ok(ranked
            .into_iter()
            .filter_map(|(id, score)| {
                catalog
                    .get(&id)
                    .map(|item| ScoredItem::from_item(item, score, ScoreSource::Collaborative))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(1, "Movie 1 (2020)", "Action|Adventure"),
            CatalogItem::new(2, "Movie 2 (2019)", "Comedy|Romance"),
            CatalogItem::new(3, "Movie 3 (2018)", "Drama|Thriller"),
            CatalogItem::new(4, "Movie 4 (2021)", "Action|Sci-Fi"),
            CatalogItem::new(5, "Movie 5 (2017)", "Comedy|Drama"),
        ]
    }

    fn ratings() -> Vec<RatingEntry> {
        [
            (1, 1, 5.0),
            (1, 2, 3.0),
            (1, 4, 4.0),
            (2, 1, 4.0),
            (2, 3, 5.0),
            (2, 5, 3.0),
            (3, 2, 2.0),
            (3, 3, 4.0),
            (3, 4, 5.0),
        ]
        .into_iter()
        .map(|(user, item, value)| RatingEntry::new(user, item, value))
        .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_zero_filled_correlations() {
        let matrix = RatingMatrix::from_ratings(&ratings());
        assert_eq!(matrix.user_count(), 3);
        assert_eq!(matrix.item_count(), 5);

        let mode = CorrelationMode::ZeroFilled;
        assert_close(matrix.correlation(1, 1, mode).unwrap(), 1.0);
        assert_close(matrix.correlation(1, 2, mode).unwrap(), 0.0);
        assert_close(matrix.correlation(1, 3, mode).unwrap(), -0.5);
        assert_close(matrix.correlation(1, 4, mode).unwrap(), -0.5);
        assert_close(matrix.correlation(1, 5, mode).unwrap(), 3.0 / 84f64.sqrt());
    }

    #[test]
    fn test_pairwise_needs_two_shared_raters() {
        let matrix = RatingMatrix::from_ratings(&ratings());
        let mode = CorrelationMode::PairwiseComplete;

        // Items 1 and 4 share only user 1
        assert_eq!(matrix.correlation(1, 4, mode), None);
        // Items 3 and 4 share only user 3; items 2 and 4 share users 1 and 3
        assert_eq!(matrix.correlation(3, 4, mode), None);
        assert_close(matrix.correlation(2, 4, mode).unwrap(), -1.0);
    }

    #[test]
    fn test_recommend_ranks_by_correlation() {
        let (items, ratings) = (items(), ratings());
        let recs = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 10, &Deadline::unbounded())
            .unwrap();

        let ids: Vec<ItemId> = recs.iter().map(|r| r.item_id).collect();
        // 3 and 4 tie at -0.5 and keep id order
        assert_eq!(ids, vec![5, 2, 3, 4]);
        assert!(recs.iter().all(|r| r.source == ScoreSource::Collaborative));
        assert!(recs.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn test_recommend_truncates_to_k() {
        let (items, ratings) = (items(), ratings());
        let recs = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 2, &Deadline::unbounded())
            .unwrap();
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn test_unknown_item() {
        let (items, ratings) = (items(), ratings());
        let result = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(42, 3, &Deadline::unbounded());
        assert_eq!(result, Err(RecommendError::UnknownItem(42)));
    }

    #[test]
    fn test_unrated_item_has_no_variance() {
        let mut items = items();
        items.push(CatalogItem::new(6, "Unrated", "Drama"));
        let ratings = ratings();
        let result = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(6, 3, &Deadline::unbounded());
        assert_eq!(result, Err(RecommendError::InsufficientVariance(6)));
    }

    #[test]
    fn test_constant_column_has_no_variance() {
        let items = items();
        let ratings = vec![
            RatingEntry::new(1, 1, 4.0),
            RatingEntry::new(2, 1, 4.0),
            RatingEntry::new(1, 2, 3.0),
        ];
        let result = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 3, &Deadline::unbounded());
        assert_eq!(result, Err(RecommendError::InsufficientVariance(1)));
    }

    #[test]
    fn test_last_duplicate_rating_wins() {
        let ratings = vec![RatingEntry::new(1, 1, 1.0), RatingEntry::new(1, 1, 4.5)];
        let matrix = RatingMatrix::from_ratings(&ratings);
        assert_eq!(matrix.column(1).unwrap().get(&1), Some(&4.5));
    }

    #[test]
    fn test_non_finite_rating_is_a_computation_failure() {
        let items = items();
        let mut ratings = ratings();
        ratings.push(RatingEntry::new(4, 1, f64::NAN));
        let result = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 3, &Deadline::unbounded());
        assert!(matches!(result, Err(RecommendError::ComputationFailure(_))));
    }

    #[test]
    fn test_pairwise_recommend_ranks_over_co_raters() {
        let items = vec![
            CatalogItem::new(1, "Heat (1995)", "Action|Crime"),
            CatalogItem::new(2, "Casino (1995)", "Crime|Drama"),
            CatalogItem::new(3, "Babe (1995)", "Children|Drama"),
            CatalogItem::new(4, "Nixon (1995)", "Drama"),
        ];
        let ratings: Vec<RatingEntry> = [
            (1, 1, 5.0),
            (1, 2, 4.0),
            (1, 3, 1.0),
            (1, 4, 2.0),
            (2, 1, 3.0),
            (2, 2, 2.0),
            (2, 3, 3.0),
            (3, 1, 1.0),
            (3, 2, 1.0),
            (3, 3, 5.0),
            (4, 2, 5.0),
        ]
        .into_iter()
        .map(|(user, item, value)| RatingEntry::new(user, item, value))
        .collect();

        let recs = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::PairwiseComplete)
            .recommend(1, 10, &Deadline::unbounded())
            .unwrap();

        // Item 4 shares a single rater with item 1 and is dropped; user 4 never counts
        let ids: Vec<ItemId> = recs.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_close(recs[0].score, 6.0 / (8.0f64 * 14.0 / 3.0).sqrt());
        assert_close(recs[1].score, -1.0);
    }

    #[test]
    fn test_pairwise_variance_gate_uses_observed_ratings() {
        let items = items();
        let ratings = vec![
            RatingEntry::new(1, 1, 4.0),
            RatingEntry::new(2, 1, 4.0),
            RatingEntry::new(1, 2, 3.0),
            RatingEntry::new(3, 2, 5.0),
        ];

        let pairwise = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::PairwiseComplete)
            .recommend(1, 3, &Deadline::unbounded());
        assert_eq!(pairwise, Err(RecommendError::InsufficientVariance(1)));

        // Zero-filled, user 3's missing rating gives item 1 variance
        let zero_filled = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 3, &Deadline::unbounded());
        assert!(zero_filled.is_ok());
    }

    #[test]
    fn test_pairwise_fixture_has_no_defined_neighbours() {
        let (items, ratings) = (items(), ratings());
        let recs = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::PairwiseComplete)
            .recommend(1, 10, &Deadline::unbounded())
            .unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_expired_deadline() {
        let (items, ratings) = (items(), ratings());
        let deadline = Deadline::after(std::time::Duration::ZERO);
        let result = CollaborativeRecommender::new(&items, &ratings, CorrelationMode::ZeroFilled)
            .recommend(1, 3, &deadline);
        assert_eq!(result, Err(RecommendError::DeadlineExceeded));
    }
}
