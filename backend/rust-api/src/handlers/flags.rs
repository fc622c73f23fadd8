use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::FlagQuestionRequest;
use crate::services::{flag_service::FlagService, AppState};

/// POST /api/v1/question-flags — report a question; re-flagging updates the
/// existing report.
pub async fn flag_question(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<FlagQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let service = FlagService::new(state.mongo.clone(), state.store_timeout());
    let flag = service.flag_question(&claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(flag)))
}
