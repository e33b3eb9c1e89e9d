use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::{error::AppResult, middleware::RequestId, routes::AppState, services::EngineStats};

/// Handler for catalog and index status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<EngineStats> {
    Json(state.engine().await.stats())
}

/// Handler for reloading the tables and rebuilding the index
pub async fn reload(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<EngineStats>> {
    tracing::info!(request_id = %request_id, "Processing catalog reload request");

    let stats = state.reload().await?;
    Ok(Json(stats))
}
