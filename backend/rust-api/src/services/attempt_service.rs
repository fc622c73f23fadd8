use chrono::{SecondsFormat, Utc};
use mongodb::bson::{doc, Bson};
use mongodb::Database;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{is_duplicate_key, AppError};
use crate::metrics::ATTEMPTS_TOTAL;
use crate::models::{Quiz, QuizAttempt, UpdateAttemptRequest};

use super::{bounded, bounded_write};

/// Attempt lifecycle: NOT_STARTED -> IN_PROGRESS (resolve/create) ->
/// COMPLETED (terminal). A completed attempt is never reopened; the next
/// resolve creates a fresh one.
pub struct AttemptService {
    mongo: Database,
    timeout: Duration,
}

impl AttemptService {
    pub fn new(mongo: Database, timeout: Duration) -> Self {
        Self { mongo, timeout }
    }

    fn attempts(&self) -> mongodb::Collection<QuizAttempt> {
        self.mongo.collection("quiz_attempts")
    }

    /// Returns the caller's open attempt for the quiz, creating one when none
    /// exists or the latest is completed. Safe under concurrent calls: the
    /// partial unique index on (user_id, quiz_id, open) makes the second
    /// insert fail with a duplicate key, and we return the winner's row.
    /// The bool is true when a new attempt was created.
    pub async fn resolve_or_create(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<(QuizAttempt, bool), AppError> {
        let quizzes = self.mongo.collection::<Quiz>("quizzes");
        let quiz = bounded(self.timeout, quizzes.find_one(doc! { "_id": quiz_id })).await?;
        if quiz.is_none() {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let latest = bounded(
            self.timeout,
            self.attempts()
                .find_one(doc! { "user_id": user_id, "quiz_id": quiz_id })
                .sort(doc! { "started_at": -1 }),
        )
        .await?;

        if let Some(attempt) = latest {
            if attempt.completed_at.is_none() {
                return Ok((attempt, false));
            }
        }

        let attempt = QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            last_answered_question_id: None,
            score: 0,
        };

        match bounded_write(self.timeout, async {
            self.attempts().insert_one(&attempt).await.map(|_| ())
        })
        .await?
        {
            Ok(()) => {
                ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();
                tracing::info!(
                    "Created attempt {} for user {} on quiz {}",
                    attempt.id,
                    user_id,
                    quiz_id
                );
                Ok((attempt, true))
            }
            Err(err) if is_duplicate_key(&err) => {
                // A concurrent request won the insert race; hand back its row.
                let existing = self.open_attempt(user_id, quiz_id).await?;
                existing
                    .map(|attempt| (attempt, false))
                    .ok_or(AppError::StoreUnavailable)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn open_attempt(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<Option<QuizAttempt>, AppError> {
        bounded(
            self.timeout,
            self.attempts().find_one(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id,
                "completed_at": Bson::Null,
            }),
        )
        .await
    }

    /// Partial update, owner-checked. `id`, `user_id` and `quiz_id` are not
    /// patchable by construction of the $set document.
    pub async fn update(
        &self,
        attempt_id: &str,
        caller_user_id: &str,
        patch: UpdateAttemptRequest,
    ) -> Result<QuizAttempt, AppError> {
        let existing = bounded(
            self.timeout,
            self.attempts().find_one(doc! { "_id": attempt_id }),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))?;

        if existing.user_id != caller_user_id {
            return Err(AppError::Forbidden(
                "Attempt belongs to another user".to_string(),
            ));
        }

        if patch.is_empty() {
            return Ok(existing);
        }

        let mut set = doc! {};
        if let Some(question_id) = &patch.last_answered_question_id {
            set.insert("last_answered_question_id", question_id);
        }
        if let Some(score) = patch.score {
            set.insert("score", score);
        }
        if let Some(completed_at) = patch.completed_at {
            // Stored in the same RFC 3339 form serde writes on insert.
            set.insert(
                "completed_at",
                completed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            );
        }

        bounded(
            self.timeout,
            self.attempts()
                .update_one(doc! { "_id": attempt_id }, doc! { "$set": set }),
        )
        .await?;

        bounded(
            self.timeout,
            self.attempts().find_one(doc! { "_id": attempt_id }),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))
    }

    /// Marks the attempt completed with its final score. Completing an
    /// already-completed attempt is rejected with Conflict; the conditional
    /// filter on completed_at makes the decision atomic.
    pub async fn complete(
        &self,
        attempt_id: &str,
        caller_user_id: &str,
        final_score: i64,
    ) -> Result<QuizAttempt, AppError> {
        let existing = bounded(
            self.timeout,
            self.attempts().find_one(doc! { "_id": attempt_id }),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))?;

        if existing.user_id != caller_user_id {
            return Err(AppError::Forbidden(
                "Attempt belongs to another user".to_string(),
            ));
        }

        let now = Utc::now();
        let updated = bounded(
            self.timeout,
            self.attempts().update_one(
                doc! { "_id": attempt_id, "completed_at": Bson::Null },
                doc! { "$set": {
                    "completed_at": now.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    "score": final_score,
                } },
            ),
        )
        .await?;

        if updated.matched_count == 0 {
            return Err(AppError::Conflict(
                "Attempt is already completed".to_string(),
            ));
        }

        ATTEMPTS_TOTAL.with_label_values(&["completed"]).inc();
        tracing::info!(
            "Completed attempt {} for user {} with score {}",
            attempt_id,
            caller_user_id,
            final_score
        );

        bounded(
            self.timeout,
            self.attempts().find_one(doc! { "_id": attempt_id }),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))
    }
}
