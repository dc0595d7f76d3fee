use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl QuizError {
    pub fn status(&self) -> StatusCode {
        match self {
            QuizError::SessionNotFound(_) | QuizError::NotFound(_) => StatusCode::NOT_FOUND,
            QuizError::InvalidAnswer(_) | QuizError::Validation(_) => StatusCode::BAD_REQUEST,
            QuizError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for QuizError {
    fn from(errors: validator::ValidationErrors) -> Self {
        QuizError::Validation(errors.to_string())
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            QuizError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(body)).into_response()
    }
}
