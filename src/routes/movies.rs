use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{CatalogItem, ItemId, RecommendationList, ScoredItem},
    routes::AppState,
    services::RecommendationEngine,
};

const DEFAULT_RECOMMENDATIONS: usize = 10;
const MIN_RECOMMENDATIONS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 50;
const DEFAULT_WEIGHT: f64 = 0.5;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub num_recommendations: Option<usize>,
    pub weight_content: Option<f64>,
    pub weight_collab: Option<f64>,
}

/// Validated hybrid request parameters
#[derive(Debug, Clone, Copy, PartialEq)]
struct HybridParams {
    k: usize,
    weight_content: f64,
    weight_collab: f64,
}

impl RecommendationQuery {
    fn validate(&self) -> AppResult<HybridParams> {
        let k = self.num_recommendations.unwrap_or(DEFAULT_RECOMMENDATIONS);
        if !(MIN_RECOMMENDATIONS..=MAX_RECOMMENDATIONS).contains(&k) {
            return Err(AppError::InvalidInput(format!(
                "num_recommendations must be between {} and {}",
                MIN_RECOMMENDATIONS, MAX_RECOMMENDATIONS
            )));
        }

        let weight_content = validate_weight("weight_content", self.weight_content)?;
        let weight_collab = validate_weight("weight_collab", self.weight_collab)?;

        Ok(HybridParams {
            k,
            weight_content,
            weight_collab,
        })
    }
}

fn validate_weight(name: &str, weight: Option<f64>) -> AppResult<f64> {
    let weight = weight.unwrap_or(DEFAULT_WEIGHT);
    if (0.0..=1.0).contains(&weight) {
        Ok(weight)
    } else {
        Err(AppError::InvalidInput(format!(
            "{} must be between 0 and 1",
            name
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub limit: Option<usize>,
}

impl SimilarQuery {
    fn validate(&self) -> AppResult<usize> {
        let limit = self.limit.unwrap_or(DEFAULT_RECOMMENDATIONS);
        if (1..=MAX_LIMIT).contains(&limit) {
            Ok(limit)
        } else {
            Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )))
        }
    }
}

/// Handler for a single catalog record
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<ItemId>,
) -> AppResult<Json<CatalogItem>> {
    let engine = state.engine().await;
    let movie = require_movie(&engine, movie_id)?.clone();
    Ok(Json(movie))
}

/// Handler for hybrid recommendations
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<ItemId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationList>> {
    let params = query.validate()?;
    let engine = state.engine().await;
    require_movie(&engine, movie_id)?;

    tracing::info!(
        request_id = %request_id,
        movie_id,
        k = params.k,
        weight_content = params.weight_content,
        weight_collab = params.weight_collab,
        "Processing hybrid recommendation request"
    );

    let recommendations = rank(engine, move |engine| {
        engine.hybrid_recommend(
            movie_id,
            params.k,
            params.weight_content,
            params.weight_collab,
        )
    })
    .await?;

    if recommendations.is_empty() {
        tracing::info!(request_id = %request_id, movie_id, "No hybrid recommendations available");
    }

    Ok(Json(recommendations.into()))
}

/// Handler for tag-similarity neighbours
pub async fn similar_content(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<ItemId>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<RecommendationList>> {
    let limit = query.validate()?;
    let engine = state.engine().await;
    require_movie(&engine, movie_id)?;

    let recommendations =
        rank(engine, move |engine| engine.content_recommend(movie_id, limit)).await?;
    Ok(Json(recommendations.into()))
}

/// Handler for rating-correlation neighbours
pub async fn similar_collaborative(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<ItemId>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<RecommendationList>> {
    let limit = query.validate()?;
    let engine = state.engine().await;
    require_movie(&engine, movie_id)?;

    let recommendations =
        rank(engine, move |engine| engine.collaborative_recommend(movie_id, limit)).await?;
    Ok(Json(recommendations.into()))
}

fn require_movie(engine: &RecommendationEngine, movie_id: ItemId) -> AppResult<&CatalogItem> {
    engine
        .item(movie_id)
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))
}

/// Runs a ranking off the async executor
async fn rank<F>(engine: Arc<RecommendationEngine>, ranking: F) -> AppResult<Vec<ScoredItem>>
where
    F: FnOnce(&RecommendationEngine) -> Vec<ScoredItem> + Send + 'static,
{
    tokio::task::spawn_blocking(move || ranking(&engine))
        .await
        .map_err(|e| AppError::Internal(format!("Ranking task failed: {}", e)))
}
