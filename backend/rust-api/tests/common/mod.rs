#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use calculus_quiz_api::{
    config::Config,
    create_router,
    services::{
        kv_store::{shared, MemoryStore},
        AppState,
    },
};

/// Router plus the state and content directory behind it. The directory
/// lives as long as the app.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub data_dir: TempDir,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// App over the standard fixtures with learner state kept in memory.
pub fn create_test_app() -> TestApp {
    let data_dir = fixture_dir();
    create_app_with(data_dir, |_| {})
}

/// App over `data_dir` with learner state persisted to the default state file.
pub fn create_persistent_app(data_dir: TempDir) -> TestApp {
    init_tracing();
    let config = Config::with_data_dir(data_dir.path());
    let state = Arc::new(AppState::new(config).expect("Failed to initialize test app state"));
    TestApp {
        router: create_router(state.clone()),
        state,
        data_dir,
    }
}

pub fn create_app_with(data_dir: TempDir, configure: impl FnOnce(&mut Config)) -> TestApp {
    init_tracing();
    let mut config = Config::with_data_dir(data_dir.path());
    configure(&mut config);

    let state = Arc::new(
        AppState::with_store(config, shared(MemoryStore::default()))
            .expect("Failed to initialize test app state"),
    );
    TestApp {
        router: create_router(state.clone()),
        state,
        data_dir,
    }
}

pub fn empty_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Content directory with the fixture problems and lessons, no topics.
pub fn fixture_dir() -> TempDir {
    let dir = empty_dir();
    write_json(dir.path(), "problems.json", &fixture_problems());
    write_json(dir.path(), "lessons.json", &fixture_lessons());
    dir
}

pub fn write_json(dir: &Path, file: &str, value: &Value) {
    std::fs::write(dir.join(file), serde_json::to_vec_pretty(value).unwrap())
        .expect("Failed to write fixture");
}

/// Two hints then the power-rule lesson for `hinted`; `bare` has only
/// solution steps and a concept without a lesson.
pub fn fixture_problems() -> Value {
    json!({
        "problems": [
            {
                "id": "hinted",
                "question": "What is the derivative of x^2?",
                "answer": "2x",
                "conceptIds": ["power-rule"],
                "hints": ["Use the power rule", "Bring the exponent down"],
                "solutionSteps": ["d/dx x^2 = 2x"],
                "lessonTopic": "Derivatives - Power Rule"
            },
            {
                "id": "bare",
                "question": "What is the integral of 2x?",
                "answer": "x^2 + C",
                "conceptIds": ["integration"],
                "solutionSteps": ["Reverse the power rule", "Add the constant"]
            }
        ]
    })
}

pub fn fixture_lessons() -> Value {
    json!({
        "lessons": [
            {
                "id": "power-rule-basics",
                "conceptId": "power-rule",
                "title": "The Power Rule",
                "shortDescription": "Bring the exponent down",
                "steps": [
                    { "type": "explanation", "content": "d/dx x^n = n x^(n-1)" }
                ]
            }
        ]
    })
}

pub fn answer_for(problem_id: &str) -> &'static str {
    match problem_id {
        "hinted" => "2x",
        "bare" => "x^2 + C",
        other => panic!("no fixture answer for {}", other),
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub async fn create_session(app: &Router) -> Value {
    let (status, json) = send(app, "POST", "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

pub async fn submit(app: &Router, session_id: &str, answer: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", session_id),
        Some(json!({ "answer": answer })),
    )
    .await
}

pub async fn current_problem_id(app: &Router, session_id: &str) -> Option<String> {
    let (_, view) = send(app, "GET", &format!("/api/v1/sessions/{}", session_id), None).await;
    view["current_problem"]["id"].as_str().map(str::to_string)
}

/// Skips until `problem_id` is current. Problems are shuffled per session.
pub async fn advance_to(app: &Router, session_id: &str, problem_id: &str) {
    while current_problem_id(app, session_id).await.as_deref() != Some(problem_id) {
        let (status, view) = send(
            app,
            "POST",
            &format!("/api/v1/sessions/{}/skip", session_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            !view["is_over"].as_bool().unwrap(),
            "{} was never current",
            problem_id
        );
    }
}
