use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Content-quality report on a question. One flag per (user, question);
/// re-flagging updates the existing report and resets it to pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_id: String,
    pub user_id: String,
    pub reason: String,
    pub details: Option<String>,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Pending,
    InReview,
    Resolved,
    Rejected,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FlagQuestionRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub reason: String,
    pub details: Option<String>,
}
