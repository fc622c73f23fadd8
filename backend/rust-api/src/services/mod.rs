use std::future::IntoFuture;
use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};

use crate::config::Config;
use crate::error::AppError;

pub mod attempt_service;
pub mod flag_service;
pub mod progress_service;
pub mod response_service;
pub mod sequence_service;

pub struct AppState {
    pub config: Config,
    pub mongo_client: MongoClient,
    pub mongo: Database,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        let state = Self {
            config,
            mongo_client,
            mongo,
        };

        tracing::info!("Ensuring MongoDB indexes...");
        tokio::time::timeout(Duration::from_secs(30), state.ensure_indexes())
            .await
            .map_err(|_| anyhow::anyhow!("Index bootstrap timeout after 30s"))??;
        tracing::info!("MongoDB indexes ready");

        Ok(state)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.config.store_timeout_ms)
    }

    /// Unique indexes back every read-then-write race in the API: the single
    /// open attempt per (user, quiz), one bookmark per (user, question), and
    /// idempotent incorrect-response inserts.
    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        for (collection, index) in index_specs() {
            self.mongo
                .collection::<mongodb::bson::Document>(collection)
                .create_index(index)
                .await?;
        }
        Ok(())
    }
}

fn index_specs() -> Vec<(&'static str, IndexModel)> {
    let unique = || IndexOptions::builder().unique(true).build();

    vec![
        // At most one open (completed_at == null) attempt per user and quiz.
        // New attempts always insert completed_at explicitly, so $type: "null"
        // matches exactly the open ones.
        (
            "quiz_attempts",
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "quiz_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "completed_at": { "$type": "null" } })
                        .build(),
                )
                .build(),
        ),
        (
            "bookmarks",
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "question_id": 1 })
                .options(unique())
                .build(),
        ),
        // user_id leads the key: attempt_id may be null, and a unique index
        // treats null as a value, so without the user the first (null,
        // question, choice) row would block every other user's copy of the
        // same mistake.
        (
            "incorrect_responses",
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "attempt_id": 1, "question_id": 1, "choice_id": 1 })
                .options(unique())
                .build(),
        ),
        // One ordering edge per (quiz, question), plus the delivery sort key.
        (
            "quiz_questions",
            IndexModel::builder()
                .keys(doc! { "quiz_id": 1, "question_id": 1 })
                .options(unique())
                .build(),
        ),
        (
            "quiz_questions",
            IndexModel::builder()
                .keys(doc! { "quiz_id": 1, "order": 1 })
                .build(),
        ),
        (
            "flagged_questions",
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "question_id": 1 })
                .options(unique())
                .build(),
        ),
    ]
}

/// Runs a store call under the configured deadline. Timeouts and driver
/// errors both surface as StoreUnavailable; nothing here retries.
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: IntoFuture<Output = Result<T, mongodb::error::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => {
            tracing::error!("Store call exceeded {:?} deadline", timeout);
            Err(AppError::StoreUnavailable)
        }
    }
}

/// Same deadline handling, but hands the driver error back to the caller so
/// it can branch on duplicate-key writes.
pub(crate) async fn bounded_write<T, F>(
    timeout: Duration,
    fut: F,
) -> Result<Result<T, mongodb::error::Error>, AppError>
where
    F: IntoFuture<Output = Result<T, mongodb::error::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Ok(result),
        Err(_) => {
            tracing::error!("Store call exceeded {:?} deadline", timeout);
            Err(AppError::StoreUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs_for(collection: &str) -> Vec<IndexModel> {
        index_specs()
            .into_iter()
            .filter(|(name, _)| *name == collection)
            .map(|(_, index)| index)
            .collect()
    }

    fn key_names(index: &IndexModel) -> Vec<String> {
        index.keys.iter().map(|(key, _)| key.to_string()).collect()
    }

    fn is_unique(index: &IndexModel) -> bool {
        index
            .options
            .as_ref()
            .and_then(|options| options.unique)
            .unwrap_or(false)
    }

    #[test]
    fn incorrect_response_uniqueness_is_scoped_to_the_user() {
        let specs = specs_for("incorrect_responses");
        assert_eq!(specs.len(), 1);
        assert!(is_unique(&specs[0]));
        assert_eq!(
            key_names(&specs[0]),
            vec!["user_id", "attempt_id", "question_id", "choice_id"]
        );
    }

    #[test]
    fn open_attempt_index_is_partial_on_null_completed_at() {
        let specs = specs_for("quiz_attempts");
        assert_eq!(specs.len(), 1);
        assert!(is_unique(&specs[0]));
        assert_eq!(key_names(&specs[0]), vec!["user_id", "quiz_id"]);

        let filter = specs[0]
            .options
            .as_ref()
            .and_then(|options| options.partial_filter_expression.clone())
            .unwrap();
        assert_eq!(filter, doc! { "completed_at": { "$type": "null" } });
    }

    #[test]
    fn ordering_edges_are_unique_per_quiz_and_question() {
        let specs = specs_for("quiz_questions");
        assert_eq!(specs.len(), 2);
        assert!(is_unique(&specs[0]));
        assert_eq!(key_names(&specs[0]), vec!["quiz_id", "question_id"]);
        assert!(!is_unique(&specs[1]));
        assert_eq!(key_names(&specs[1]), vec!["quiz_id", "order"]);
    }
}
