use serde::{Deserialize, Serialize};
use validator::Validate;

use super::feedback::{ErrorAnalysis, FeedbackDirective};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Answer must be between 1 and 500 characters"
    ))]
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// The session was already over; nothing changed.
    Ignored,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub outcome: AnswerOutcome,
    pub correct: bool,
    pub score: u32,
    pub current_index: usize,
    pub total_problems: usize,
    pub is_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<FeedbackDirective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_analysis: Option<ErrorAnalysis>,
}

/// Stateless check used by `/api/games/submit`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerRequest {
    #[validate(length(min = 1, message = "Problem id is required"))]
    pub problem_id: String,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Answer must be between 1 and 500 characters"
    ))]
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAnswerResponse {
    pub correct: bool,
    pub message: String,
}
