use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's pass through a quiz. Terminal once `completed_at` is set; at
/// most one open attempt may exist per (user, quiz), enforced by a partial
/// unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_answered_question_id: Option<String>,
    pub score: i64,
}

impl QuizAttempt {
    pub fn status(&self) -> AttemptStatus {
        if self.completed_at.is_some() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Partial update for an attempt. `id`, `user_id` and `quiz_id` are never
/// patchable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAttemptRequest {
    pub last_answered_question_id: Option<String>,
    pub score: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UpdateAttemptRequest {
    pub fn is_empty(&self) -> bool {
        self.last_answered_question_id.is_none()
            && self.score.is_none()
            && self.completed_at.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteAttemptRequest {
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_attempt_is_in_progress() {
        let attempt = QuizAttempt {
            id: "a1".to_string(),
            quiz_id: "q1".to_string(),
            user_id: "u1".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            last_answered_question_id: None,
            score: 0,
        };
        assert_eq!(attempt.status(), AttemptStatus::InProgress);
    }

    #[test]
    fn completed_attempt_is_terminal() {
        let attempt = QuizAttempt {
            id: "a1".to_string(),
            quiz_id: "q1".to_string(),
            user_id: "u1".to_string(),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            last_answered_question_id: Some("question".to_string()),
            score: 7,
        };
        assert_eq!(attempt.status(), AttemptStatus::Completed);
    }

    // Hand-built $set documents write timestamps with
    // to_rfc3339_opts(AutoSi, true); that must stay byte-identical to what
    // serde writes on insert, or string comparisons against stored values
    // diverge.
    #[test]
    fn patched_timestamps_match_the_serialized_form() {
        let now = Utc::now();
        let attempt = QuizAttempt {
            id: "a1".to_string(),
            quiz_id: "q1".to_string(),
            user_id: "u1".to_string(),
            started_at: now,
            completed_at: Some(now),
            last_answered_question_id: None,
            score: 0,
        };

        let value = serde_json::to_value(&attempt).unwrap();
        let patched = now.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true);
        assert_eq!(value["completed_at"], serde_json::json!(patched));
        assert_eq!(value["started_at"], serde_json::json!(patched));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UpdateAttemptRequest::default().is_empty());
        let patch = UpdateAttemptRequest {
            score: Some(3),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
