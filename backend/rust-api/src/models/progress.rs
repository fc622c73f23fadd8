use serde::Serialize;

use super::attempt::AttemptStatus;

#[derive(Debug, Serialize)]
pub struct QuizProgress {
    pub quiz_id: String,
    pub status: AttemptStatus,
    pub completed_questions: u64,
    pub total_questions: u64,
    pub completion_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct CategoryProgress {
    pub category_id: String,
    pub total_quizzes: u64,
    pub completed_quizzes: u64,
    pub completion_pct: f64,
}
