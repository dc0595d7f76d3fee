use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WrongAnswer,
    HintViewed,
    HintRequested,
    LessonOpened,
    LessonCompleted,
    SolutionViewed,
    QuestionRetried,
    QuestionSkipped,
    CorrectAnswer,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WrongAnswer => "wrong_answer",
            EventKind::HintViewed => "hint_viewed",
            EventKind::HintRequested => "hint_requested",
            EventKind::LessonOpened => "lesson_opened",
            EventKind::LessonCompleted => "lesson_completed",
            EventKind::SolutionViewed => "solution_viewed",
            EventKind::QuestionRetried => "question_retried",
            EventKind::QuestionSkipped => "question_skipped",
            EventKind::CorrectAnswer => "correct_answer",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Optional fields attached to a recorded event.
#[derive(Debug, Clone, Default)]
pub struct EventFields {
    pub question_id: Option<String>,
    pub concept_id: Option<String>,
    pub attempt_number: Option<u32>,
    pub metadata: Option<serde_json::Value>,
}

impl EventFields {
    pub fn question(question_id: impl Into<String>) -> Self {
        Self {
            question_id: Some(question_id.into()),
            ..Self::default()
        }
    }

    pub fn with_concept(mut self, concept_id: Option<&str>) -> Self {
        self.concept_id = concept_id.map(str::to_string);
        self
    }

    pub fn with_attempt(mut self, attempt_number: u32) -> Self {
        self.attempt_number = Some(attempt_number);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsMetrics {
    pub total_attempts: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub accuracy_rate: f64,
    pub hints_viewed: u32,
    pub lessons_opened: u32,
    pub lessons_completed: u32,
    pub lesson_completion_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub kind: Option<EventKind>,
    pub question_id: Option<String>,
    pub concept_id: Option<String>,
}
