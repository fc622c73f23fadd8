use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; connect-src 'self'"),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Learner + editorial API (JWT protected)
        .nest(
            "/api/v1",
            api_routes()
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<std::sync::Arc<services::AppState>> {
    // Attempt lifecycle + delivery + tracking (any authenticated learner)
    let learner_routes = Router::new()
        .route(
            "/quizzes/{quiz_id}/attempt",
            get(handlers::attempts::resolve_attempt),
        )
        .route(
            "/attempts/{id}",
            patch(handlers::attempts::update_attempt),
        )
        .route(
            "/attempts/{id}/complete",
            post(handlers::attempts::complete_attempt),
        )
        .route(
            "/quizzes/{quiz_id}/questions",
            get(handlers::questions::list_questions),
        )
        .route(
            "/quizzes/{quiz_id}/progress",
            get(handlers::progress::quiz_progress),
        )
        .route(
            "/categories/{category_id}/progress",
            get(handlers::progress::category_progress),
        )
        .route("/bookmarks", post(handlers::responses::add_bookmark))
        .route(
            "/bookmarks/{question_id}",
            delete(handlers::responses::remove_bookmark),
        )
        .route(
            "/incorrect-responses",
            post(handlers::responses::record_incorrect)
                .get(handlers::responses::incorrect_choices),
        )
        .route("/question-flags", post(handlers::flags::flag_question));

    // Sequence mutation (editor/admin only)
    let editor_routes = Router::new()
        .route(
            "/quizzes/{quiz_id}/questions",
            post(handlers::questions::add_question),
        )
        .route(
            "/quizzes/{quiz_id}/questions/{question_id}",
            delete(handlers::questions::remove_question),
        )
        .route(
            "/quizzes/{quiz_id}/questions/reorder",
            post(handlers::questions::reorder_questions),
        )
        .route_layer(middleware::from_fn(
            middlewares::auth::editor_guard_middleware,
        ));

    learner_routes.merge(editor_routes)
}
