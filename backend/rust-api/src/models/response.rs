use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Append-only record of a wrong selection. Unique per
/// (user_id, attempt_id, question_id, choice_id) so resubmission is
/// idempotent without one user's row shadowing another's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncorrectResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub choice_id: String,
    pub attempt_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordIncorrectRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
    #[validate(length(min = 1, message = "choice_id must not be empty"))]
    pub choice_id: String,
    pub attempt_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookmarkRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
}
