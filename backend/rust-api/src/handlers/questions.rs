use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{AddQuestionRequest, DeliveredQuestion, Question, ReorderRequest};
use crate::services::{
    bounded, response_service::ResponseService, sequence_service::SequenceService, AppState,
};

fn sequence_service(state: &AppState) -> SequenceService {
    SequenceService::new(
        state.mongo_client.clone(),
        state.mongo.clone(),
        state.store_timeout(),
    )
}

/// GET /api/v1/quizzes/{quiz_id}/questions — the delivery sequence: dense
/// order, per-request shuffled choices, bookmark and prior-mistake
/// annotations.
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sequencer = sequence_service(&state);
    sequencer.quiz_exists(&quiz_id).await?;
    let ordering = sequencer.list_ordered(&quiz_id).await?;

    let question_ids: Vec<String> = ordering.iter().map(|(_, id)| id.clone()).collect();
    let questions = load_questions(&state, &question_ids).await?;

    let tracker = ResponseService::new(state.mongo.clone(), state.store_timeout());
    let bookmarked = tracker
        .bookmarked_questions(&claims.sub, &question_ids)
        .await?;
    let incorrect = tracker
        .incorrect_choices_for(&claims.sub, &question_ids)
        .await?;

    let delivered = assemble_delivery(
        &ordering,
        questions,
        &bookmarked,
        &incorrect,
        &mut rand::rng(),
    );
    Ok(Json(delivered))
}

async fn load_questions(
    state: &AppState,
    question_ids: &[String],
) -> Result<HashMap<String, Question>, AppError> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<Bson> = question_ids
        .iter()
        .map(|id| Bson::String(id.clone()))
        .collect();
    let questions: Vec<Question> = bounded(state.store_timeout(), async {
        state
            .mongo
            .collection::<Question>("questions")
            .find(doc! { "_id": { "$in": ids } })
            .await?
            .try_collect()
            .await
    })
    .await?;

    Ok(questions
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect())
}

/// Joins the dense ordering against loaded questions. Edges whose question is
/// missing or inactive are skipped, matching what the ordering invariant
/// promises about output rather than storage. Choice order is randomized per
/// delivery and never persisted.
fn assemble_delivery<R: Rng>(
    ordering: &[(i64, String)],
    mut questions: HashMap<String, Question>,
    bookmarked: &HashSet<String>,
    incorrect: &HashMap<String, Vec<String>>,
    rng: &mut R,
) -> Vec<DeliveredQuestion> {
    ordering
        .iter()
        .filter_map(|(_, question_id)| {
            let question = questions.remove(question_id)?;
            question.is_active.then_some((question_id, question))
        })
        .enumerate()
        .map(|(position, (question_id, question))| {
            let mut choices = question.choices;
            choices.shuffle(rng);

            DeliveredQuestion {
                id: question.id,
                order: position as i64,
                content: question.content,
                explanation: question.explanation,
                image_url: question.image_url,
                choices,
                is_bookmarked: bookmarked.contains(question_id),
                incorrect_choice_ids: incorrect.get(question_id).cloned().unwrap_or_default(),
            }
        })
        .collect()
}

/// POST /api/v1/quizzes/{quiz_id}/questions — editor append.
pub async fn add_question(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    AppJson(req): AppJson<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let order = sequence_service(&state)
        .append(&quiz_id, &req.question_id)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

/// DELETE /api/v1/quizzes/{quiz_id}/questions/{question_id} — editor removal
/// with renormalization.
pub async fn remove_question(
    State(state): State<Arc<AppState>>,
    Path((quiz_id, question_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    sequence_service(&state)
        .remove(&quiz_id, &question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/quizzes/{quiz_id}/questions/reorder — editor move-element.
pub async fn reorder_questions(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> Result<impl IntoResponse, AppError> {
    sequence_service(&state)
        .reorder(&quiz_id, req.old_index, req.new_index)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Choice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(id: &str, active: bool, choice_ids: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            content: format!("content {}", id),
            explanation: None,
            image_url: None,
            is_active: active,
            category_id: "c1".to_string(),
            choices: choice_ids
                .iter()
                .enumerate()
                .map(|(i, cid)| Choice {
                    id: cid.to_string(),
                    content: format!("choice {}", cid),
                    is_correct: i == 0,
                    explanation: None,
                })
                .collect(),
        }
    }

    fn fixtures() -> (Vec<(i64, String)>, HashMap<String, Question>) {
        let ordering = vec![
            (0, "q1".to_string()),
            (1, "q2".to_string()),
            (2, "q3".to_string()),
        ];
        let questions: HashMap<String, Question> = [
            question("q1", true, &["c1", "c2", "c3", "c4"]),
            question("q2", false, &["c5", "c6"]),
            question("q3", true, &["c7", "c8"]),
        ]
        .into_iter()
        .map(|q| (q.id.clone(), q))
        .collect();
        (ordering, questions)
    }

    #[test]
    fn inactive_questions_are_skipped_and_order_re_densified() {
        let (ordering, questions) = fixtures();
        let mut rng = StdRng::seed_from_u64(7);
        let delivered = assemble_delivery(
            &ordering,
            questions,
            &HashSet::new(),
            &HashMap::new(),
            &mut rng,
        );

        let ids: Vec<&str> = delivered.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
        let orders: Vec<i64> = delivered.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn annotations_are_attached_per_question() {
        let (ordering, questions) = fixtures();
        let bookmarked: HashSet<String> = ["q3".to_string()].into_iter().collect();
        let incorrect: HashMap<String, Vec<String>> =
            [("q1".to_string(), vec!["c2".to_string(), "c3".to_string()])]
                .into_iter()
                .collect();

        let mut rng = StdRng::seed_from_u64(7);
        let delivered = assemble_delivery(&ordering, questions, &bookmarked, &incorrect, &mut rng);

        assert!(!delivered[0].is_bookmarked);
        assert_eq!(delivered[0].incorrect_choice_ids, vec!["c2", "c3"]);
        assert!(delivered[1].is_bookmarked);
        assert!(delivered[1].incorrect_choice_ids.is_empty());
    }

    #[test]
    fn shuffle_keeps_the_choice_set_intact() {
        let (ordering, questions) = fixtures();
        let mut rng = StdRng::seed_from_u64(42);
        let delivered = assemble_delivery(
            &ordering,
            questions,
            &HashSet::new(),
            &HashMap::new(),
            &mut rng,
        );

        let mut ids: Vec<&str> = delivered[0].choices.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn shuffle_is_deterministic_for_a_seeded_source() {
        let (ordering, questions) = fixtures();
        let delivered_a = assemble_delivery(
            &ordering,
            questions.clone(),
            &HashSet::new(),
            &HashMap::new(),
            &mut StdRng::seed_from_u64(1),
        );
        let delivered_b = assemble_delivery(
            &ordering,
            questions,
            &HashSet::new(),
            &HashMap::new(),
            &mut StdRng::seed_from_u64(1),
        );

        let a: Vec<&str> = delivered_a[0].choices.iter().map(|c| c.id.as_str()).collect();
        let b: Vec<&str> = delivered_b[0].choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(a, b);
    }
}
