use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{CreateBookmarkRequest, RecordIncorrectRequest};
use crate::services::{response_service::ResponseService, AppState};

fn tracker(state: &AppState) -> ResponseService {
    ResponseService::new(state.mongo.clone(), state.store_timeout())
}

/// POST /api/v1/bookmarks — 409 when the question is already bookmarked.
pub async fn add_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateBookmarkRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    tracker(&state)
        .add_bookmark(&claims.sub, &req.question_id)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

/// DELETE /api/v1/bookmarks/{question_id} — idempotent removal.
pub async fn remove_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracker(&state)
        .remove_bookmark(&claims.sub, &question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/incorrect-responses — idempotent append of a wrong selection.
pub async fn record_incorrect(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<RecordIncorrectRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    tracker(&state)
        .record_incorrect(
            &claims.sub,
            &req.question_id,
            &req.choice_id,
            req.attempt_id.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

#[derive(Debug, Deserialize)]
pub struct IncorrectChoicesQuery {
    pub question_id: String,
}

/// GET /api/v1/incorrect-responses?question_id= — prior mistakes for one
/// question.
pub async fn incorrect_choices(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<IncorrectChoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let question_ids = vec![query.question_id.clone()];
    let by_question = tracker(&state)
        .incorrect_choices_for(&claims.sub, &question_ids)
        .await?;

    let choices = by_question
        .get(&query.question_id)
        .cloned()
        .unwrap_or_default();
    Ok(Json(json!({ "incorrect_choices": choices })))
}
