use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Content Metrics
    pub static ref PROBLEM_LOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_problem_loads_total",
        "Problem sets loaded, by origin",
        &["origin"]
    )
    .unwrap();

    pub static ref LESSON_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_lesson_lookups_total",
        "Lesson lookups by concept, by result",
        &["result"]
    )
    .unwrap();

    pub static ref CONTENT_FETCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "quiz_content_fetch_duration_seconds",
        "Content fetch duration in seconds",
        &["kind"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Quiz Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Total number of quiz sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_sessions_active",
        "Number of quiz sessions currently held in memory"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_submitted_total",
        "Total number of answers submitted",
        &["correct"]
    )
    .unwrap();

    pub static ref FEEDBACK_DIRECTIVES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_feedback_directives_total",
        "Feedback directives returned after wrong answers, by escalation tier",
        &["tier"]
    )
    .unwrap();

    pub static ref ANALYTICS_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_analytics_events_total",
        "Learner analytics events recorded",
        &["kind"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Times a content fetch (problems, lessons) under the given kind label.
pub async fn track_content_fetch<F, T>(kind: &str, future: F) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;

    CONTENT_FETCH_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(start.elapsed().as_secs_f64());

    result
}
