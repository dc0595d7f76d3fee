use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use super::analytics_log::AnalyticsLog;
use super::answer_normalizer::{answer_feedback, is_equivalent, is_valid_expression};
use super::feedback_policy::FeedbackPolicy;
use super::mistake_analysis::analyze_incorrect_answer;
use crate::error::QuizError;
use crate::models::analytics::{EventFields, EventKind};
use crate::models::answer::AnswerOutcome;
use crate::models::feedback::{ErrorAnalysis, FeedbackDirective};
use crate::models::lesson::Lesson;
use crate::models::problem::Problem;
use crate::models::{ProblemInfo, ProblemOrigin, SessionView};

/// Result of a submitted answer, before it is combined with the session view.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub outcome: AnswerOutcome,
    pub attempt_number: Option<u32>,
    pub directive: Option<FeedbackDirective>,
    pub answer_feedback: Option<String>,
    pub error_analysis: Option<ErrorAnalysis>,
}

impl SubmitOutcome {
    fn ignored() -> Self {
        Self {
            outcome: AnswerOutcome::Ignored,
            attempt_number: None,
            directive: None,
            answer_feedback: None,
            error_analysis: None,
        }
    }
}

/// How `request_help` resolved, recorded as the `mode` of `hint_requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpMode {
    Hint,
    Lesson,
    Fallback,
    None,
}

impl HelpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelpMode::Hint => "hint",
            HelpMode::Lesson => "lesson",
            HelpMode::Fallback => "fallback",
            HelpMode::None => "none",
        }
    }
}

/// One play-through of a shuffled problem set.
///
/// The session owns score and position only; mistakes, hint positions and
/// lesson flags live in the progress store and outlive the session.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    problems: Vec<Problem>,
    origin: ProblemOrigin,
    score: u32,
    current_index: usize,
    is_over: bool,
    feedback: Option<FeedbackDirective>,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(problems: Vec<Problem>, origin: ProblemOrigin) -> Self {
        let is_over = problems.is_empty();
        Self {
            id: Uuid::new_v4(),
            problems,
            origin,
            score: 0,
            current_index: 0,
            is_over,
            feedback: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_problems(&self) -> usize {
        self.problems.len()
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    pub fn origin(&self) -> ProblemOrigin {
        self.origin
    }

    pub fn feedback(&self) -> Option<&FeedbackDirective> {
        self.feedback.as_ref()
    }

    pub fn current_problem(&self) -> Option<&Problem> {
        if self.is_over {
            return None;
        }
        self.problems.get(self.current_index)
    }

    fn advance(&mut self) {
        if self.current_index + 1 < self.problems.len() {
            self.current_index += 1;
        } else {
            self.is_over = true;
        }
    }

    pub async fn submit(
        &mut self,
        answer: &str,
        policy: &FeedbackPolicy,
    ) -> Result<SubmitOutcome, QuizError> {
        if !is_valid_expression(answer) {
            return Err(QuizError::InvalidAnswer(
                "Enter a math expression with balanced parentheses".to_string(),
            ));
        }

        let Some(problem) = self.current_problem().cloned() else {
            tracing::debug!(session_id = %self.id, "Answer ignored, session is over");
            return Ok(SubmitOutcome::ignored());
        };

        if is_equivalent(answer, &problem.answer) {
            let attempt = policy.handle_correct(&problem);
            self.score += 1;
            self.feedback = None;
            self.advance();

            tracing::info!(
                session_id = %self.id,
                question_id = %problem.id,
                attempt,
                score = self.score,
                "Correct answer"
            );

            return Ok(SubmitOutcome {
                outcome: AnswerOutcome::Correct,
                attempt_number: Some(attempt),
                directive: None,
                answer_feedback: None,
                error_analysis: None,
            });
        }

        let directive = policy.handle_incorrect(&problem).await;
        self.feedback = Some(directive.clone());

        tracing::info!(
            session_id = %self.id,
            question_id = %problem.id,
            tier = directive.tier(),
            "Incorrect answer"
        );

        Ok(SubmitOutcome {
            outcome: AnswerOutcome::Incorrect,
            attempt_number: Some(policy.progress().mistakes(&problem.id)),
            answer_feedback: answer_feedback(answer, &problem.answer),
            error_analysis: Some(analyze_incorrect_answer(
                answer,
                &problem.answer,
                &problem.question,
            )),
            directive: Some(directive),
        })
    }

    /// Opens help without a wrong answer: the first hint, else the problem's
    /// lesson reference, else the general reading material.
    pub fn request_help(&mut self, analytics: &AnalyticsLog) -> FeedbackDirective {
        let (directive, mode, question_id) = match self.current_problem() {
            None => (
                FeedbackDirective::ShowLesson {
                    lesson: Lesson::calculus_text(),
                },
                HelpMode::None,
                None,
            ),
            Some(problem) => {
                let (directive, mode) = if let Some(hint) = problem.hints.first() {
                    (
                        FeedbackDirective::ShowHint {
                            hint: hint.clone(),
                            hint_index: 0,
                        },
                        HelpMode::Hint,
                    )
                } else if problem.lesson_topic.is_some() || problem.lesson_url.is_some() {
                    let concept = problem.primary_concept().unwrap_or_default();
                    (
                        FeedbackDirective::ShowLesson {
                            lesson: Lesson::reference(
                                concept,
                                problem.lesson_topic.as_deref(),
                                problem.lesson_url.as_deref(),
                            ),
                        },
                        HelpMode::Lesson,
                    )
                } else {
                    (
                        FeedbackDirective::ShowLesson {
                            lesson: Lesson::calculus_text(),
                        },
                        HelpMode::Fallback,
                    )
                };
                (directive, mode, Some(problem.id.clone()))
            }
        };

        analytics.record(
            EventKind::HintRequested,
            EventFields {
                question_id,
                metadata: Some(json!({ "mode": mode.as_str() })),
                ..EventFields::default()
            },
        );
        self.feedback = Some(directive.clone());
        directive
    }

    /// Moves past the current problem without touching its progress.
    pub fn skip(&mut self, analytics: &AnalyticsLog) {
        let Some(problem) = self.current_problem() else {
            return;
        };
        analytics.record(
            EventKind::QuestionSkipped,
            EventFields::question(problem.id.as_str()),
        );
        self.feedback = None;
        self.advance();
    }

    pub fn retry(&mut self, analytics: &AnalyticsLog) {
        let Some(problem) = self.current_problem() else {
            return;
        };
        analytics.record(
            EventKind::QuestionRetried,
            EventFields::question(problem.id.as_str()),
        );
        self.feedback = None;
    }

    /// Starts the same problem sequence over. Learner progress is kept.
    pub fn reset(&mut self) {
        self.score = 0;
        self.current_index = 0;
        self.is_over = self.problems.is_empty();
        self.feedback = None;
    }

    pub fn points(&self, points_per_question: u32) -> u32 {
        self.score.saturating_mul(points_per_question)
    }

    /// Earned points over available points, rounded to a whole percentage.
    pub fn completion_percentage(&self, points_per_question: u32) -> f64 {
        let available = (self.problems.len() as u64) * u64::from(points_per_question);
        if available == 0 {
            return 0.0;
        }
        let earned = u64::from(self.score) * u64::from(points_per_question);
        (earned as f64 / available as f64 * 100.0).round()
    }

    pub fn view(&self, points_per_question: u32) -> SessionView {
        SessionView {
            session_id: self.id,
            score: self.score,
            points: self.points(points_per_question),
            current_index: self.current_index,
            total_problems: self.problems.len(),
            is_over: self.is_over,
            origin: self.origin,
            started_at: self.started_at,
            completion_percentage: self.completion_percentage(points_per_question),
            current_problem: self.current_problem().map(ProblemInfo::from),
            feedback: self.feedback.clone(),
        }
    }
}
