use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub explanation: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub category_id: String,
    /// Unordered set of choices; exactly one carries `is_correct = true`,
    /// enforced at authoring time.
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub content: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// A question as delivered to the client: choices in randomized order,
/// annotated with the caller's bookmark and prior-mistake history.
#[derive(Debug, Serialize)]
pub struct DeliveredQuestion {
    pub id: String,
    pub order: i64,
    pub content: String,
    pub explanation: Option<String>,
    pub image_url: Option<String>,
    pub choices: Vec<Choice>,
    pub is_bookmarked: bool,
    pub incorrect_choice_ids: Vec<String>,
}
