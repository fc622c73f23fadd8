use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::middlewares::auth::JwtClaims;
use crate::services::{progress_service::ProgressService, AppState};

/// GET /api/v1/quizzes/{quiz_id}/progress
pub async fn quiz_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = ProgressService::new(state.mongo.clone(), state.store_timeout());
    let progress = service.quiz_progress(&quiz_id, &claims.sub).await?;
    Ok(Json(progress))
}

/// GET /api/v1/categories/{category_id}/progress
pub async fn category_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = ProgressService::new(state.mongo.clone(), state.store_timeout());
    let progress = service.category_progress(&category_id, &claims.sub).await?;
    Ok(Json(progress))
}
