use chrono::{SecondsFormat, Utc};
use mongodb::bson::doc;
use mongodb::Database;
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FlagQuestionRequest, FlagStatus, FlaggedQuestion, Question};

use super::bounded;

/// Content-quality reports. One flag per (user, question): re-flagging
/// replaces the reason/details and resets the report to pending.
pub struct FlagService {
    mongo: Database,
    timeout: Duration,
}

impl FlagService {
    pub fn new(mongo: Database, timeout: Duration) -> Self {
        Self { mongo, timeout }
    }

    fn flags(&self) -> mongodb::Collection<FlaggedQuestion> {
        self.mongo.collection("flagged_questions")
    }

    pub async fn flag_question(
        &self,
        user_id: &str,
        req: FlagQuestionRequest,
    ) -> Result<FlaggedQuestion, AppError> {
        let questions = self.mongo.collection::<Question>("questions");
        if bounded(
            self.timeout,
            questions.find_one(doc! { "_id": &req.question_id }),
        )
        .await?
        .is_none()
        {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        let existing = bounded(
            self.timeout,
            self.flags()
                .find_one(doc! { "user_id": user_id, "question_id": &req.question_id }),
        )
        .await?;

        let now = Utc::now();
        if let Some(flag) = existing {
            bounded(
                self.timeout,
                self.flags().update_one(
                    doc! { "_id": &flag.id },
                    doc! { "$set": {
                        "reason": &req.reason,
                        "details": req.details.as_deref(),
                        "status": "pending",
                        "updated_at": now.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    } },
                ),
            )
            .await?;

            tracing::info!("User {} re-flagged question {}", user_id, req.question_id);
            return Ok(FlaggedQuestion {
                reason: req.reason,
                details: req.details,
                status: FlagStatus::Pending,
                updated_at: now,
                ..flag
            });
        }

        let flag = FlaggedQuestion {
            id: Uuid::new_v4().to_string(),
            question_id: req.question_id,
            user_id: user_id.to_string(),
            reason: req.reason,
            details: req.details,
            status: FlagStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        bounded(self.timeout, async {
            self.flags().insert_one(&flag).await.map(|_| ())
        })
        .await?;

        tracing::info!("User {} flagged question {}", user_id, flag.question_id);
        Ok(flag)
    }
}
