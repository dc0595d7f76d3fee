use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::QuizError,
    extractors::AppJson,
    models::{
        answer::{CheckAnswerRequest, CheckAnswerResponse},
        problem::ProblemListResponse,
    },
    services::{answer_normalizer::is_equivalent, AppState},
};

fn content_error(what: &str, e: anyhow::Error) -> (StatusCode, String) {
    tracing::error!("Failed to load {}: {:#}", what, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error reading {} file", what),
    )
}

/// GET /api/games/problems
pub async fn list_problems(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.content.problem_set().await {
        Ok(Some(problems)) => Ok(Json(ProblemListResponse { problems })),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            "Problems file not found; clients fall back to generated problems".to_string(),
        )),
        Err(e) => Err(content_error("problems", e)),
    }
}

/// POST /api/games/submit
///
/// Stateless check against the stored problem set using the same
/// equivalence rules as quiz sessions. Does not touch learner progress.
pub async fn check_answer(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CheckAnswerRequest>,
) -> Result<impl IntoResponse, QuizError> {
    req.validate()?;

    let problems = state
        .content
        .problem_set()
        .await?
        .ok_or_else(|| QuizError::NotFound("Problems file not found".to_string()))?;
    let problem = problems
        .iter()
        .find(|p| p.id == req.problem_id)
        .ok_or_else(|| QuizError::NotFound(format!("Problem {} not found", req.problem_id)))?;

    let correct = is_equivalent(&req.answer, &problem.answer);
    let message = if correct {
        "Correct! Well done."
    } else {
        "Incorrect. Try again!"
    };

    Ok(Json(CheckAnswerResponse {
        correct,
        message: message.to_string(),
    }))
}

/// GET /api/lessons
pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.content.lesson_catalog().await {
        Ok(Some(catalog)) => Ok(Json(catalog)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            "Lessons file not found".to_string(),
        )),
        Err(e) => Err(content_error("lessons", e)),
    }
}

/// GET /api/lessons/{concept_id}
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let catalog = match state.content.lesson_catalog().await {
        Ok(Some(catalog)) => catalog,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                "Lessons file not found".to_string(),
            ))
        }
        Err(e) => return Err(content_error("lessons", e)),
    };

    match catalog.find_by_concept(&concept_id) {
        Some(lesson) => Ok(Json(lesson.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            "Lesson not found for this concept".to_string(),
        )),
    }
}

/// GET /api/topics
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, QuizError> {
    let topics = state
        .content
        .topic_catalog()
        .await?
        .map(|catalog| catalog.topics)
        .unwrap_or_default();
    Ok(Json(json!({ "topics": topics })))
}

/// GET /api/topics/{topic_id}
pub async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(topic_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let catalog = state.content.topic_catalog().await?.unwrap_or_default();
    let topic = catalog
        .topic(&topic_id)
        .cloned()
        .ok_or_else(|| QuizError::NotFound(format!("Topic {} not found", topic_id)))?;
    Ok(Json(topic))
}

/// GET /api/topics/{topic_id}/lessons/{lesson_id}
pub async fn get_topic_lesson(
    State(state): State<Arc<AppState>>,
    Path((topic_id, lesson_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, QuizError> {
    let catalog = state.content.topic_catalog().await?.unwrap_or_default();
    let lesson = catalog
        .lesson(&topic_id, &lesson_id)
        .cloned()
        .ok_or_else(|| {
            QuizError::NotFound(format!(
                "Lesson {} not found in topic {}",
                lesson_id, topic_id
            ))
        })?;
    Ok(Json(lesson))
}
