use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod analytics;
pub mod answer;
pub mod feedback;
pub mod lesson;
pub mod problem;
pub mod progress;
pub mod topic;

use feedback::FeedbackDirective;
use problem::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemOrigin {
    /// Problems came from the configured content source.
    Source,
    /// Problems were generated locally after the source failed or was empty.
    Fallback,
}

impl ProblemOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemOrigin::Source => "source",
            ProblemOrigin::Fallback => "fallback",
        }
    }
}

/// Learner-facing view of a quiz session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub score: u32,
    pub points: u32,
    pub current_index: usize,
    pub total_problems: usize,
    pub is_over: bool,
    pub origin: ProblemOrigin,
    pub started_at: DateTime<Utc>,
    pub completion_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_problem: Option<ProblemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackDirective>,
}

/// Problem without its answer, hints or solution.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemInfo {
    pub id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub concept_ids: Vec<String>,
    pub hint_count: usize,
}

impl From<&Problem> for ProblemInfo {
    fn from(problem: &Problem) -> Self {
        Self {
            id: problem.id.clone(),
            question: problem.question.clone(),
            topic: problem.topic.clone(),
            concept_ids: problem.concept_ids.clone(),
            hint_count: problem.hints.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub total_problems: usize,
    pub origin: ProblemOrigin,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub directive: FeedbackDirective,
    pub session: SessionView,
}
