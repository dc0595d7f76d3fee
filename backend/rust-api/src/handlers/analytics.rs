use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{models::analytics::EventsQuery, services::AppState};

const DEFAULT_EVENTS_LIMIT: usize = 50;

/// GET /api/v1/analytics/metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.analytics().metrics())
}

/// GET /api/v1/analytics/events
///
/// Filters apply before the limit; results are oldest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let analytics = state.analytics();
    let limit = query.limit.unwrap_or(DEFAULT_EVENTS_LIMIT);

    let mut events = match (&query.kind, &query.question_id, &query.concept_id) {
        (None, None, None) => analytics.recent_events(limit),
        (Some(kind), _, _) => analytics.events_by_kind(*kind),
        (None, Some(question_id), _) => analytics.events_by_question(question_id),
        (None, None, Some(concept_id)) => analytics.events_by_concept(concept_id),
    };

    events.retain(|event| {
        matches_filter(query.question_id.as_deref(), event.question_id.as_deref())
            && matches_filter(query.concept_id.as_deref(), event.concept_id.as_deref())
    });
    let skip = events.len().saturating_sub(limit);
    events.drain(..skip);

    Json(json!({
        "total": analytics.len(),
        "events": events
    }))
}

fn matches_filter(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        Some(wanted) => value == Some(wanted),
        None => true,
    }
}

/// DELETE /api/v1/analytics
pub async fn clear_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.analytics().clear();
    tracing::info!("Analytics log cleared");
    StatusCode::NO_CONTENT
}
