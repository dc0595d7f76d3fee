use serde::{Deserialize, Serialize};

use super::lesson::Lesson;

/// What the presentation layer should show after an answer or a help request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackDirective {
    ShowHint { hint: String, hint_index: usize },
    ShowLesson { lesson: Lesson },
    ShowSolution { steps: Vec<String> },
    ShowMessage { message: String },
}

impl FeedbackDirective {
    /// Escalation tier label, used for metrics.
    pub fn tier(&self) -> &'static str {
        match self {
            FeedbackDirective::ShowHint { .. } => "hint",
            FeedbackDirective::ShowLesson { .. } => "lesson",
            FeedbackDirective::ShowSolution { .. } => "solution",
            FeedbackDirective::ShowMessage { .. } => "message",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    SignError,
    MissingConstant,
    PowerRuleIncomplete,
    TrigDerivativeSign,
    ChainRuleMissing,
    ProductRuleError,
    QuotientRuleError,
    GeneralMistake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub error_type: ErrorType,
    pub explanation: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_serializes_with_type_tag() {
        let directive = FeedbackDirective::ShowHint {
            hint: "h1".to_string(),
            hint_index: 0,
        };
        let json = serde_json::to_value(&directive).unwrap();
        assert_eq!(json["type"], "show_hint");
        assert_eq!(json["hint"], "h1");
        assert_eq!(json["hint_index"], 0);
        assert_eq!(directive.tier(), "hint");
    }
}
