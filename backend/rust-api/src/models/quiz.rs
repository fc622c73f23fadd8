use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Ordering edge between a quiz and a question. For a given quiz the stored
/// `order` values form a dense 0..n-1 sequence; every mutation that breaks
/// this invariant must restore it before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub question_id: String,
    pub order: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub old_index: i64,
    pub new_index: i64,
}
