use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Database};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{is_duplicate_key, AppError};
use crate::metrics::REORDERS_TOTAL;
use crate::models::{Quiz, QuizQuestion};

use super::{bounded, bounded_write};

/// Owns the per-quiz question ordering: dense 0..n-1 order values, append,
/// removal with renormalization, and the move-element rewrite.
pub struct SequenceService {
    client: MongoClient,
    mongo: Database,
    timeout: Duration,
}

impl SequenceService {
    pub fn new(client: MongoClient, mongo: Database, timeout: Duration) -> Self {
        Self {
            client,
            mongo,
            timeout,
        }
    }

    fn edges(&self) -> mongodb::Collection<QuizQuestion> {
        self.mongo.collection("quiz_questions")
    }

    pub async fn quiz_exists(&self, quiz_id: &str) -> Result<(), AppError> {
        let quizzes = self.mongo.collection::<Quiz>("quizzes");
        let found = bounded(self.timeout, quizzes.find_one(doc! { "_id": quiz_id })).await?;
        match found {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Quiz not found".to_string())),
        }
    }

    /// Edges sorted by stored order. Storage may carry gaps (it never should,
    /// but delivery must not depend on that); `list_ordered` densifies.
    async fn sorted_edges(&self, quiz_id: &str) -> Result<Vec<QuizQuestion>, AppError> {
        bounded(self.timeout, async {
            self.edges()
                .find(doc! { "quiz_id": quiz_id })
                .sort(doc! { "order": 1 })
                .await?
                .try_collect()
                .await
        })
        .await
    }

    /// The delivery sequence: (order, question_id) pairs with order values
    /// rewritten to the dense positions 0..n-1.
    pub async fn list_ordered(&self, quiz_id: &str) -> Result<Vec<(i64, String)>, AppError> {
        let edges = self.sorted_edges(quiz_id).await?;
        Ok(edges
            .into_iter()
            .enumerate()
            .map(|(position, edge)| (position as i64, edge.question_id))
            .collect())
    }

    /// Links a question at the end of the quiz: order = max + 1, or 0 for the
    /// first question.
    pub async fn append(&self, quiz_id: &str, question_id: &str) -> Result<i64, AppError> {
        self.quiz_exists(quiz_id).await?;

        let last = bounded(
            self.timeout,
            self.edges()
                .find_one(doc! { "quiz_id": quiz_id })
                .sort(doc! { "order": -1 }),
        )
        .await?;
        let order = last.map(|edge| edge.order + 1).unwrap_or(0);

        let edge = QuizQuestion {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            question_id: question_id.to_string(),
            order,
        };

        match bounded_write(self.timeout, async {
            self.edges().insert_one(&edge).await.map(|_| ())
        })
        .await?
        {
            Ok(()) => {
                tracing::info!(
                    "Appended question {} to quiz {} at order {}",
                    question_id,
                    quiz_id,
                    order
                );
                Ok(order)
            }
            Err(err) if is_duplicate_key(&err) => Err(AppError::Conflict(
                "Question is already linked to this quiz".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Unlinks a question and renormalizes the survivors back to 0..n-1 in a
    /// single transactional batch, preserving relative order.
    pub async fn remove(&self, quiz_id: &str, question_id: &str) -> Result<(), AppError> {
        self.quiz_exists(quiz_id).await?;

        let deleted = bounded(
            self.timeout,
            self.edges()
                .delete_one(doc! { "quiz_id": quiz_id, "question_id": question_id }),
        )
        .await?;
        if deleted.deleted_count == 0 {
            return Err(AppError::NotFound(
                "Question is not linked to this quiz".to_string(),
            ));
        }

        let remaining = self.sorted_edges(quiz_id).await?;
        let dense: Vec<i64> = (0..remaining.len() as i64).collect();
        self.apply_order_mapping(&remaining, &dense).await?;

        REORDERS_TOTAL.with_label_values(&["renormalize"]).inc();
        tracing::info!(
            "Removed question {} from quiz {}; renormalized {} edges",
            question_id,
            quiz_id,
            remaining.len()
        );
        Ok(())
    }

    /// Moves the element at `old_index` to `new_index`, shifting everything
    /// in between by one slot. The whole order column is rewritten in one
    /// transaction so no observer sees a duplicate or missing order value.
    pub async fn reorder(
        &self,
        quiz_id: &str,
        old_index: i64,
        new_index: i64,
    ) -> Result<(), AppError> {
        self.quiz_exists(quiz_id).await?;

        let edges = self.sorted_edges(quiz_id).await?;
        let len = edges.len() as i64;

        if old_index < 0 || old_index >= len || new_index < 0 || new_index >= len {
            return Err(AppError::InvalidArgument(format!(
                "Indices must be within [0, {}); got old_index={}, new_index={}",
                len, old_index, new_index
            )));
        }

        if old_index == new_index {
            return Ok(());
        }

        let orders = shifted_orders(edges.len(), old_index as usize, new_index as usize);
        self.apply_order_mapping(&edges, &orders).await?;

        REORDERS_TOTAL.with_label_values(&["reorder"]).inc();
        tracing::info!(
            "Reordered quiz {}: moved index {} to {}",
            quiz_id,
            old_index,
            new_index
        );
        Ok(())
    }

    /// Applies edge-id -> new-order atomically. All-or-nothing: a partial
    /// rewrite would leave duplicate order values behind.
    async fn apply_order_mapping(
        &self,
        edges: &[QuizQuestion],
        orders: &[i64],
    ) -> Result<(), AppError> {
        debug_assert_eq!(edges.len(), orders.len());
        if edges.is_empty() {
            return Ok(());
        }

        let collection = self.edges();
        bounded(self.timeout, async {
            let mut session = self.client.start_session().await?;
            session.start_transaction().await?;

            for (edge, order) in edges.iter().zip(orders) {
                let result = collection
                    .update_one(
                        doc! { "_id": &edge.id },
                        doc! { "$set": { "order": order } },
                    )
                    .session(&mut session)
                    .await;
                if let Err(err) = result {
                    session.abort_transaction().await.ok();
                    return Err(err);
                }
            }

            session.commit_transaction().await
        })
        .await
    }
}

/// New order value for every current dense position, for a move of
/// `old_index` to `new_index`. The result is a bijection onto 0..len-1:
/// positions strictly between the two indices shift one slot toward the
/// vacated end, everything else keeps its place.
fn shifted_orders(len: usize, old_index: usize, new_index: usize) -> Vec<i64> {
    (0..len)
        .map(|position| {
            let order = if position == old_index {
                new_index
            } else if old_index < new_index && position > old_index && position <= new_index {
                position - 1
            } else if old_index > new_index && position >= new_index && position < old_index {
                position + 1
            } else {
                position
            };
            order as i64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Applies the order mapping to a labelled sequence and returns the labels
    // sorted by their new order value.
    fn apply<'a>(labels: &[&'a str], old: usize, new: usize) -> Vec<&'a str> {
        let orders = shifted_orders(labels.len(), old, new);
        let mut paired: Vec<(i64, &str)> = orders.into_iter().zip(labels.iter().copied()).collect();
        paired.sort_by_key(|(order, _)| *order);
        paired.into_iter().map(|(_, label)| label).collect()
    }

    #[test]
    fn move_toward_front_shifts_predecessors_down() {
        let result = apply(&["A", "B", "C", "D", "E"], 2, 0);
        assert_eq!(result, vec!["C", "A", "B", "D", "E"]);
    }

    #[test]
    fn move_toward_back_shifts_successors_up() {
        let result = apply(&["A", "B", "C", "D", "E"], 0, 2);
        assert_eq!(result, vec!["B", "C", "A", "D", "E"]);
    }

    #[test]
    fn same_index_is_identity() {
        for i in 0..5 {
            let orders = shifted_orders(5, i, i);
            assert_eq!(orders, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn adjacent_swap() {
        assert_eq!(apply(&["A", "B", "C"], 0, 1), vec!["B", "A", "C"]);
        assert_eq!(apply(&["A", "B", "C"], 2, 1), vec!["A", "C", "B"]);
    }

    #[test]
    fn move_to_last_position() {
        assert_eq!(
            apply(&["A", "B", "C", "D"], 1, 3),
            vec!["A", "C", "D", "B"]
        );
    }

    #[test]
    fn single_element_sequence() {
        assert_eq!(shifted_orders(1, 0, 0), vec![0]);
    }

    // Every (old, new) pair must produce a permutation of 0..n-1: no order
    // value skipped, none assigned twice.
    #[test]
    fn mapping_is_a_bijection_for_all_valid_pairs() {
        for len in 1..=6 {
            for old in 0..len {
                for new in 0..len {
                    let mut orders = shifted_orders(len, old, new);
                    orders.sort_unstable();
                    let expected: Vec<i64> = (0..len as i64).collect();
                    assert_eq!(
                        orders, expected,
                        "not a bijection for len={} old={} new={}",
                        len, old, new
                    );
                }
            }
        }
    }

    #[test]
    fn moved_element_lands_exactly_at_target() {
        for len in 2..=6 {
            for old in 0..len {
                for new in 0..len {
                    let orders = shifted_orders(len, old, new);
                    assert_eq!(orders[old], new as i64);
                }
            }
        }
    }
}
