use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::Database;
use uuid::Uuid;

use crate::error::{is_duplicate_key, AppError};
use crate::metrics::RESPONSES_RECORDED_TOTAL;
use crate::models::{Bookmark, IncorrectResponse};

use super::{bounded, bounded_write};

/// Records bookmarks and wrong selections, and answers the history queries
/// that annotate delivered questions. All writes here are idempotent or
/// conflict-checked, so callers may retry freely.
pub struct ResponseService {
    mongo: Database,
    timeout: Duration,
}

impl ResponseService {
    pub fn new(mongo: Database, timeout: Duration) -> Self {
        Self { mongo, timeout }
    }

    fn incorrect(&self) -> mongodb::Collection<IncorrectResponse> {
        self.mongo.collection("incorrect_responses")
    }

    fn bookmarks(&self) -> mongodb::Collection<Bookmark> {
        self.mongo.collection("bookmarks")
    }

    /// Appends a wrong-selection record. A duplicate (user, attempt,
    /// question, choice) is a no-op, not an error: resubmission from a
    /// retrying client must not produce a second row.
    pub async fn record_incorrect(
        &self,
        user_id: &str,
        question_id: &str,
        choice_id: &str,
        attempt_id: Option<&str>,
    ) -> Result<(), AppError> {
        let record = IncorrectResponse {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            choice_id: choice_id.to_string(),
            attempt_id: attempt_id.map(|id| id.to_string()),
            created_at: Utc::now(),
        };

        match bounded_write(self.timeout, async {
            self.incorrect().insert_one(&record).await.map(|_| ())
        })
        .await?
        {
            Ok(()) => {
                RESPONSES_RECORDED_TOTAL
                    .with_label_values(&["incorrect"])
                    .inc();
                Ok(())
            }
            Err(err) if is_duplicate_key(&err) => {
                tracing::debug!(
                    "Incorrect response already recorded for user {} question {} choice {}",
                    user_id,
                    question_id,
                    choice_id
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Inserts a bookmark; a second bookmark on the same question is a
    /// Conflict.
    pub async fn add_bookmark(&self, user_id: &str, question_id: &str) -> Result<(), AppError> {
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            created_at: Utc::now(),
        };

        match bounded_write(self.timeout, async {
            self.bookmarks().insert_one(&bookmark).await.map(|_| ())
        })
        .await?
        {
            Ok(()) => {
                RESPONSES_RECORDED_TOTAL
                    .with_label_values(&["bookmark"])
                    .inc();
                Ok(())
            }
            Err(err) if is_duplicate_key(&err) => Err(AppError::Conflict(
                "Question is already bookmarked".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Removing an absent bookmark succeeds silently.
    pub async fn remove_bookmark(&self, user_id: &str, question_id: &str) -> Result<(), AppError> {
        bounded(
            self.timeout,
            self.bookmarks()
                .delete_one(doc! { "user_id": user_id, "question_id": question_id }),
        )
        .await?;
        Ok(())
    }

    /// question_id -> choice ids the user previously got wrong, restricted to
    /// the given questions.
    pub async fn incorrect_choices_for(
        &self,
        user_id: &str,
        question_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, AppError> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<Bson> = question_ids
            .iter()
            .map(|id| Bson::String(id.clone()))
            .collect();
        let records: Vec<IncorrectResponse> = bounded(self.timeout, async {
            self.incorrect()
                .find(doc! { "user_id": user_id, "question_id": { "$in": ids } })
                .await?
                .try_collect()
                .await
        })
        .await?;

        let mut by_question: HashMap<String, Vec<String>> = HashMap::new();
        for record in records {
            let choices = by_question.entry(record.question_id).or_default();
            if !choices.contains(&record.choice_id) {
                choices.push(record.choice_id);
            }
        }
        Ok(by_question)
    }

    pub async fn bookmarked_questions(
        &self,
        user_id: &str,
        question_ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        if question_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<Bson> = question_ids
            .iter()
            .map(|id| Bson::String(id.clone()))
            .collect();
        let bookmarks: Vec<Bookmark> = bounded(self.timeout, async {
            self.bookmarks()
                .find(doc! { "user_id": user_id, "question_id": { "$in": ids } })
                .await?
                .try_collect()
                .await
        })
        .await?;

        Ok(bookmarks
            .into_iter()
            .map(|bookmark| bookmark.question_id)
            .collect())
    }
}
