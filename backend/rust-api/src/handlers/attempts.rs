use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{CompleteAttemptRequest, UpdateAttemptRequest};
use crate::services::{attempt_service::AttemptService, AppState};

/// GET /api/v1/quizzes/{quiz_id}/attempt — resolve-or-create. 201 when a new
/// attempt was started, 200 when an open one was resumed.
pub async fn resolve_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = AttemptService::new(state.mongo.clone(), state.store_timeout());
    let (attempt, created) = service.resolve_or_create(&claims.sub, &quiz_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(attempt)))
}

/// PATCH /api/v1/attempts/{id} — owner-checked partial update.
pub async fn update_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
    AppJson(patch): AppJson<UpdateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = AttemptService::new(state.mongo.clone(), state.store_timeout());
    let attempt = service.update(&attempt_id, &claims.sub, patch).await?;
    Ok(Json(attempt))
}

/// POST /api/v1/attempts/{id}/complete — terminal transition; 409 when the
/// attempt is already completed.
pub async fn complete_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
    AppJson(req): AppJson<CompleteAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = AttemptService::new(state.mongo.clone(), state.store_timeout());
    let attempt = service.complete(&attempt_id, &claims.sub, req.score).await?;
    Ok(Json(attempt))
}
