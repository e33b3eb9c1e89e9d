use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::ItemId;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data load error: {0}")]
    DataLoad(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Csv(_) | AppError::Io(_) | AppError::DataLoad(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Reasons a recommender produced no ranking
///
/// None of these reach the API layer: the engine's public entry points log them and
/// return an empty list, leaving the fallback decision to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("similarity index has not been built")]
    NotIndexed,

    #[error("item {0} is not in the catalog")]
    UnknownItem(ItemId),

    #[error("item {0} has no rating variance")]
    InsufficientVariance(ItemId),

    #[error("computation failed: {0}")]
    ComputationFailure(String),

    #[error("recommendation deadline exceeded")]
    DeadlineExceeded,
}

impl RecommendError {
    /// Data-insufficiency outcomes that are part of normal operation
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            RecommendError::NotIndexed
                | RecommendError::UnknownItem(_)
                | RecommendError::InsufficientVariance(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("movie 9".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let response = AppError::InvalidInput("bad weight".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_data_load_maps_to_500() {
        let response = AppError::DataLoad("truncated file".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_expected_degradations() {
        assert!(RecommendError::UnknownItem(3).is_expected());
        assert!(RecommendError::InsufficientVariance(3).is_expected());
        assert!(!RecommendError::DeadlineExceeded.is_expected());
        assert!(!RecommendError::ComputationFailure("nan".into()).is_expected());
    }
}
