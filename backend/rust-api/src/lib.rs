use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::QuizError;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The quiz front end may be served from another origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .merge(content_routes())
        .nest("/api/v1/sessions", sessions_routes())
        .nest("/api/v1/progress", progress_routes())
        .nest("/api/v1/analytics", analytics_routes())
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn content_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/games/problems", get(handlers::content::list_problems))
        .route("/api/games/submit", post(handlers::content::check_answer))
        .route("/api/lessons", get(handlers::content::list_lessons))
        .route("/api/lessons/{concept_id}", get(handlers::content::get_lesson))
        .route("/api/topics", get(handlers::content::list_topics))
        .route("/api/topics/{topic_id}", get(handlers::content::get_topic))
        .route(
            "/api/topics/{topic_id}/lessons/{lesson_id}",
            get(handlers::content::get_topic_lesson),
        )
}

fn sessions_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::sessions::create_session))
        .route(
            "/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route("/{id}/answers", post(handlers::sessions::submit_answer))
        .route("/{id}/help", post(handlers::sessions::request_help))
        .route("/{id}/skip", post(handlers::sessions::skip_problem))
        .route("/{id}/retry", post(handlers::sessions::retry_problem))
        .route("/{id}/reset", post(handlers::sessions::reset_session))
}

fn progress_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::progress::get_progress).delete(handlers::progress::reset_progress),
        )
        .route(
            "/questions/{question_id}",
            get(handlers::progress::get_question_progress),
        )
        .route(
            "/concepts/{concept_id}",
            get(handlers::progress::get_concept_progress),
        )
        .route(
            "/concepts/{concept_id}/lesson-completed",
            post(handlers::progress::complete_lesson),
        )
}

fn analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", axum::routing::delete(handlers::analytics::clear_events))
        .route("/metrics", get(handlers::analytics::get_metrics))
        .route("/events", get(handlers::analytics::list_events))
}
