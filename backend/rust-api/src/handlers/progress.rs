use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    models::progress::{ConceptProgress, QuestionProgress},
    services::AppState,
};

/// GET /api/v1/progress
pub async fn get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.progress().snapshot())
}

/// GET /api/v1/progress/questions/{question_id}
pub async fn get_question_progress(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
) -> impl IntoResponse {
    let progress = state.progress();
    Json(QuestionProgress {
        mistakes: progress.mistakes(&question_id),
        hint_index: progress.hint_index(&question_id),
        question_id,
    })
}

/// GET /api/v1/progress/concepts/{concept_id}
pub async fn get_concept_progress(
    State(state): State<Arc<AppState>>,
    Path(concept_id): Path<String>,
) -> impl IntoResponse {
    let progress = state.progress();
    Json(ConceptProgress {
        mistakes: progress.concept_mistakes(&concept_id),
        lesson_viewed: progress.has_viewed_lesson(&concept_id),
        concept_id,
    })
}

/// POST /api/v1/progress/concepts/{concept_id}/lesson-completed
pub async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    Path(concept_id): Path<String>,
) -> impl IntoResponse {
    tracing::info!(%concept_id, "Lesson completed");
    state.policy().complete_lesson(&concept_id);

    let progress = state.progress();
    Json(ConceptProgress {
        mistakes: progress.concept_mistakes(&concept_id),
        lesson_viewed: progress.has_viewed_lesson(&concept_id),
        concept_id,
    })
}

/// DELETE /api/v1/progress
pub async fn reset_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.progress().reset();
    StatusCode::NO_CONTENT
}
