use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    services::{EngineSettings, EngineStats, RecommendationEngine},
    sources::TableSource,
};

/// Shared application state
///
/// Handlers clone the current engine out from under the lock and work on that snapshot, so
/// a reload never blocks in-flight recommendations and never exposes a half-built index.
pub struct AppState {
    engine: RwLock<Arc<RecommendationEngine>>,
    source: Arc<dyn TableSource>,
    settings: EngineSettings,
}

impl AppState {
    /// Loads both tables from `source` and builds the first engine
    pub async fn load(source: Arc<dyn TableSource>, settings: EngineSettings) -> AppResult<Self> {
        let engine = build_engine(source.as_ref(), settings).await?;
        Ok(Self {
            engine: RwLock::new(Arc::new(engine)),
            source,
            settings,
        })
    }

    /// Engine snapshot for one request
    pub async fn engine(&self) -> Arc<RecommendationEngine> {
        self.engine.read().await.clone()
    }

    /// Rebuilds the engine from the source and swaps it in
    ///
    /// On failure the previous engine stays in place.
    pub async fn reload(&self) -> AppResult<EngineStats> {
        let engine = Arc::new(build_engine(self.source.as_ref(), self.settings).await?);
        let stats = engine.stats();

        *self.engine.write().await = engine;

        tracing::info!(
            source = self.source.name(),
            items = stats.items,
            ratings = stats.ratings,
            "Swapped in reloaded recommendation engine"
        );

        Ok(stats)
    }
}

async fn build_engine(
    source: &dyn TableSource,
    settings: EngineSettings,
) -> AppResult<RecommendationEngine> {
    let catalog = source.load_catalog().await?;
    let ratings = source.load_ratings().await?;

    tracing::info!(
        source = source.name(),
        items = catalog.len(),
        ratings = ratings.len(),
        "Loaded recommendation tables"
    );

    tokio::task::spawn_blocking(move || RecommendationEngine::with_index(catalog, ratings, settings))
        .await
        .map_err(|e| AppError::Internal(format!("Index build task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogItem, RatingEntry};
    use crate::sources::MockTableSource;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(1, "Heat (1995)", "Action|Crime|Thriller"),
            CatalogItem::new(2, "Casino (1995)", "Crime|Drama"),
        ]
    }

    fn mock_source() -> MockTableSource {
        let mut source = MockTableSource::new();
        source.expect_name().return_const("mock");
        source
    }

    #[tokio::test]
    async fn test_load_builds_index_eagerly() {
        let mut source = mock_source();
        source.expect_load_catalog().times(1).returning(|| Ok(catalog()));
        source
            .expect_load_ratings()
            .times(1)
            .returning(|| Ok(vec![RatingEntry::new(1, 1, 4.0)]));

        let state = AppState::load(Arc::new(source), EngineSettings::default())
            .await
            .unwrap();
        let engine = state.engine().await;

        assert!(engine.is_indexed());
        assert_eq!(engine.stats().items, 2);
    }

    #[tokio::test]
    async fn test_reload_swaps_engine() {
        let mut source = mock_source();
        let mut loads = 0;
        source.expect_load_catalog().times(2).returning(move || {
            loads += 1;
            let mut items = catalog();
            items.truncate(loads);
            Ok(items)
        });
        source.expect_load_ratings().times(2).returning(|| Ok(Vec::new()));

        let state = AppState::load(Arc::new(source), EngineSettings::default())
            .await
            .unwrap();
        let before = state.engine().await;

        let stats = state.reload().await.unwrap();

        assert_eq!(before.stats().items, 1);
        assert_eq!(stats.items, 2);
        assert_eq!(state.engine().await.stats().items, 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_engine() {
        let mut source = mock_source();
        let mut calls = 0;
        source.expect_load_catalog().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(catalog())
            } else {
                Err(AppError::DataLoad("truncated movies.csv".to_string()))
            }
        });
        source.expect_load_ratings().times(1).returning(|| Ok(Vec::new()));

        let state = AppState::load(Arc::new(source), EngineSettings::default())
            .await
            .unwrap();

        assert!(matches!(state.reload().await, Err(AppError::DataLoad(_))));
        assert_eq!(state.engine().await.stats().items, 2);
    }
}
