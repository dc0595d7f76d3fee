use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::QuizError, extractors::AppJson, models::answer::SubmitAnswerRequest,
    services::AppState,
};

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("Creating quiz session");
    let response = state.sessions.create_session().await;
    (StatusCode::CREATED, Json(response))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let session = state.sessions.get_session(session_id).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    state.sessions.delete_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, QuizError> {
    req.validate()?;
    tracing::debug!(%session_id, "Submitting answer");

    let response = state
        .sessions
        .submit_answer(session_id, &req.answer)
        .await?;
    Ok(Json(response))
}

pub async fn request_help(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let response = state.sessions.request_help(session_id).await?;
    Ok(Json(response))
}

pub async fn skip_problem(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let session = state.sessions.skip(session_id).await?;
    Ok(Json(session))
}

pub async fn retry_problem(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let session = state.sessions.retry(session_id).await?;
    Ok(Json(session))
}

pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let session = state.sessions.reset(session_id).await?;
    Ok(Json(session))
}
