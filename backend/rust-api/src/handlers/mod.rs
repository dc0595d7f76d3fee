use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::metrics;
use crate::services::content_service::{LESSONS_FILE, PROBLEMS_FILE, TOPICS_FILE};
use crate::services::AppState;

pub mod analytics;
pub mod content;
pub mod progress;
pub mod sessions;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut status = "healthy";
    let mut dependencies = serde_json::Map::new();

    let content_health = check_data_dir(&state.config.data_dir).await;
    let content_healthy =
        content_health.get("status").and_then(|v| v.as_str()) == Some("healthy");
    dependencies.insert("content".to_string(), json!(content_health));

    if !content_healthy {
        status = "degraded";
    }

    dependencies.insert(
        "sessions".to_string(),
        json!({ "active": state.sessions.active_sessions().await }),
    );

    // Missing content degrades the quiz to generated problems; it stays usable.
    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "service": "calculus-quiz-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_data_dir(data_dir: &Path) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();
    result.insert("data_dir".to_string(), json!(data_dir.display().to_string()));

    match tokio::fs::metadata(data_dir).await {
        Ok(meta) if meta.is_dir() => {
            let mut files = serde_json::Map::new();
            for file in [PROBLEMS_FILE, LESSONS_FILE, TOPICS_FILE] {
                let present = tokio::fs::try_exists(data_dir.join(file))
                    .await
                    .unwrap_or(false);
                files.insert(file.to_string(), json!(present));
            }
            result.insert("status".to_string(), json!("healthy"));
            result.insert("files".to_string(), json!(files));
        }
        Ok(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("data_dir is not a directory"));
        }
        Err(e) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert(
                "error".to_string(),
                json!(format!("data_dir unavailable: {}", e)),
            );
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth when `metrics_auth` is configured.
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.metrics_auth.as_deref() else {
        return Ok(next.run(request).await);
    };

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if !credentials_match(credentials.as_bytes(), expected.as_bytes()) {
        tracing::warn!("Rejected /metrics request with bad credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

/// Compares every byte instead of stopping at the first mismatch.
fn credentials_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_must_match_exactly() {
        assert!(credentials_match(b"ops:secret", b"ops:secret"));
        assert!(!credentials_match(b"ops:secreT", b"ops:secret"));
        assert!(!credentials_match(b"ops:secret!", b"ops:secret"));
        assert!(!credentials_match(b"", b"ops:secret"));
    }
}
