use axum::{
    extract::{FromRequest, Request},
    response::Response,
    Json,
};

use crate::error::AppError;

/// JSON extractor that rejects malformed bodies through the AppError taxonomy
/// (JSON 400 with field detail) instead of axum's plain-text rejection.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                tracing::warn!("Rejected request body: {}", rejection);
                let err = AppError::InvalidArgument(format!(
                    "Failed to parse JSON request body: {}",
                    rejection
                ));
                Err(axum::response::IntoResponse::into_response(err))
            }
        }
    }
}
