use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::Database;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{
    AttemptStatus, Category, CategoryProgress, Quiz, QuizAttempt, QuizProgress, QuizQuestion,
};

use super::bounded;

/// Rolls attempts and ordering-edge counts up into the dashboard completion
/// numbers. Denominators always come from quiz_questions edges, never the
/// questions collection, so unlinked or inactive questions cannot inflate
/// totals.
pub struct ProgressService {
    mongo: Database,
    timeout: Duration,
}

impl ProgressService {
    pub fn new(mongo: Database, timeout: Duration) -> Self {
        Self { mongo, timeout }
    }

    pub async fn quiz_progress(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> Result<QuizProgress, AppError> {
        let quizzes = self.mongo.collection::<Quiz>("quizzes");
        if bounded(self.timeout, quizzes.find_one(doc! { "_id": quiz_id }))
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let edges: Vec<QuizQuestion> = bounded(self.timeout, async {
            self.mongo
                .collection::<QuizQuestion>("quiz_questions")
                .find(doc! { "quiz_id": quiz_id })
                .sort(doc! { "order": 1 })
                .await?
                .try_collect()
                .await
        })
        .await?;
        let ordered_ids: Vec<String> = edges.into_iter().map(|edge| edge.question_id).collect();

        let latest = bounded(
            self.timeout,
            self.mongo
                .collection::<QuizAttempt>("quiz_attempts")
                .find_one(doc! { "quiz_id": quiz_id, "user_id": user_id })
                .sort(doc! { "started_at": -1 }),
        )
        .await?;

        Ok(summarize_quiz(quiz_id, &ordered_ids, latest.as_ref()))
    }

    /// Category completion is the binary quiz-completed ratio: each quiz in
    /// the category counts 1 when its latest attempt is completed, 0
    /// otherwise.
    pub async fn category_progress(
        &self,
        category_id: &str,
        user_id: &str,
    ) -> Result<CategoryProgress, AppError> {
        let categories = self.mongo.collection::<Category>("categories");
        if bounded(self.timeout, categories.find_one(doc! { "_id": category_id }))
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Category not found".to_string()));
        }

        let quizzes: Vec<Quiz> = bounded(self.timeout, async {
            self.mongo
                .collection::<Quiz>("quizzes")
                .find(doc! { "category_id": category_id })
                .await?
                .try_collect()
                .await
        })
        .await?;

        let quiz_ids: Vec<Bson> = quizzes
            .iter()
            .map(|quiz| Bson::String(quiz.id.clone()))
            .collect();
        let attempts: Vec<QuizAttempt> = if quiz_ids.is_empty() {
            Vec::new()
        } else {
            bounded(self.timeout, async {
                self.mongo
                    .collection::<QuizAttempt>("quiz_attempts")
                    .find(doc! { "user_id": user_id, "quiz_id": { "$in": quiz_ids } })
                    .await?
                    .try_collect()
                    .await
            })
            .await?
        };

        Ok(summarize_category(category_id, &quizzes, &attempts))
    }
}

fn summarize_quiz(
    quiz_id: &str,
    ordered_question_ids: &[String],
    latest_attempt: Option<&QuizAttempt>,
) -> QuizProgress {
    let total = ordered_question_ids.len() as u64;

    let status = match latest_attempt {
        None => AttemptStatus::NotStarted,
        Some(attempt) => attempt.status(),
    };

    let completed = match (status, latest_attempt) {
        (AttemptStatus::Completed, _) => total,
        (AttemptStatus::InProgress, Some(attempt)) => answered_through(
            ordered_question_ids,
            attempt.last_answered_question_id.as_deref(),
        ),
        _ => 0,
    };

    QuizProgress {
        quiz_id: quiz_id.to_string(),
        status,
        completed_questions: completed,
        total_questions: total,
        completion_pct: completion_pct(completed, total),
    }
}

fn summarize_category(
    category_id: &str,
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
) -> CategoryProgress {
    let completed = quizzes
        .iter()
        .filter(|quiz| {
            // Status follows the most recent attempt only.
            attempts
                .iter()
                .filter(|attempt| attempt.quiz_id == quiz.id)
                .max_by_key(|attempt| attempt.started_at)
                .map(|attempt| attempt.completed_at.is_some())
                .unwrap_or(false)
        })
        .count() as u64;
    let total = quizzes.len() as u64;

    CategoryProgress {
        category_id: category_id.to_string(),
        total_quizzes: total,
        completed_quizzes: completed,
        completion_pct: completion_pct(completed, total),
    }
}

/// Number of questions answered so far: the dense position of the last
/// answered question plus one. Unknown or missing question ids count as
/// nothing answered.
fn answered_through(ordered_question_ids: &[String], last_answered: Option<&str>) -> u64 {
    match last_answered {
        Some(question_id) => ordered_question_ids
            .iter()
            .position(|id| id == question_id)
            .map(|position| position as u64 + 1)
            .unwrap_or(0),
        None => 0,
    }
}

fn completion_pct(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    }
}
