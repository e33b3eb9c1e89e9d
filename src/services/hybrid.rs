use std::collections::HashMap;

use crate::{
    error::RecommendError,
    models::{ItemId, ScoreSource, ScoredItem},
    services::{
        collaborative::CollaborativeRecommender, content::ContentRecommender, deadline::Deadline,
    },
};

/// Per-signal multipliers; they need not sum to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub content: f64,
    pub collaborative: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            content: 0.5,
            collaborative: 0.5,
        }
    }
}

/// Weighted additive merge of the content and collaborative rankings
pub struct HybridBlender<'a> {
    content: ContentRecommender<'a>,
    collaborative: CollaborativeRecommender<'a>,
}

impl<'a> HybridBlender<'a> {
    pub fn new(content: ContentRecommender<'a>, collaborative: CollaborativeRecommender<'a>) -> Self {
        Self {
            content,
            collaborative,
        }
    }

    /// Top `k` items by blended score
    ///
    /// Each signal is asked for `2k` candidates. A signal that cannot rank the item
    /// contributes nothing; an expired deadline fails the whole blend.
    pub fn recommend(
        &self,
        item_id: ItemId,
        k: usize,
        weights: BlendWeights,
        deadline: &Deadline,
    ) -> Result<Vec<ScoredItem>, RecommendError> {
        let pool = k.saturating_mul(2);
        let content = settle_signal(
            ScoreSource::Content,
            self.content.recommend(item_id, pool, deadline),
        )?;
        let collaborative = settle_signal(
            ScoreSource::Collaborative,
            self.collaborative.recommend(item_id, pool, deadline),
        )?;

        let mut blended = blend(content, collaborative, weights);
        blended.retain(|(item, _)| item.item_id != item_id);

        // Stable: ties keep content-first insertion order
        blended.sort_by(|a, b| b.1.total_cmp(&a.1));
        blended.truncate(k);

        deadline.check()?;

        Ok(blended
            .into_iter()
            .map(|(item, score)| item.rescored(score, ScoreSource::Hybrid))
            .collect())
    }
}

/// Accumulates weighted scores in first-seen order, content entries first
fn blend(
    content: Vec<ScoredItem>,
    collaborative: Vec<ScoredItem>,
    weights: BlendWeights,
) -> Vec<(ScoredItem, f64)> {
    let mut positions: HashMap<ItemId, usize> = HashMap::new();
    let mut accumulated: Vec<(ScoredItem, f64)> = Vec::new();

    let weighted = content
        .into_iter()
        .map(|item| (item, weights.content))
        .chain(collaborative.into_iter().map(|item| (item, weights.collaborative)));

    for (item, weight) in weighted {
        let contribution = item.score * weight;
        match positions.get(&item.item_id) {
            Some(&position) => accumulated[position].1 += contribution,
            None => {
                positions.insert(item.item_id, accumulated.len());
                accumulated.push((item, contribution));
            }
        }
    }

    accumulated
}

/// Turns a degraded signal into an empty candidate list
fn settle_signal(
    source: ScoreSource,
    result: Result<Vec<ScoredItem>, RecommendError>,
) -> Result<Vec<ScoredItem>, RecommendError> {
    match result {
        Ok(items) => Ok(items),
        Err(RecommendError::DeadlineExceeded) => Err(RecommendError::DeadlineExceeded),
        Err(e) if e.is_expected() => {
            tracing::debug!(?source, reason = %e, "Signal contributed no candidates");
            Ok(Vec::new())
        }
        Err(e) => {
            tracing::warn!(?source, error = %e, "Signal failed, blending without it");
            Ok(Vec::new())
        }
    }
}
