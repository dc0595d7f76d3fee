use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::analytics_log::AnalyticsLog;
use super::progress_store::ProgressStore;
use crate::metrics::{FEEDBACK_DIRECTIVES_TOTAL, LESSON_LOOKUPS_TOTAL};
use crate::models::analytics::{EventFields, EventKind};
use crate::models::feedback::FeedbackDirective;
use crate::models::lesson::Lesson;
use crate::models::problem::Problem;

pub const GENERIC_MESSAGE: &str =
    "That's not quite right. Review the fundamentals for this topic and try again!";

/// Looks up the lesson for a concept. `Ok(None)` means no lesson exists.
#[async_trait]
pub trait LessonSource: Send + Sync {
    async fn lesson_for_concept(&self, concept_id: &str) -> anyhow::Result<Option<Lesson>>;
}

/// Escalating feedback after wrong answers: hints first, then the concept
/// lesson, then the worked solution, then a generic message.
#[derive(Clone)]
pub struct FeedbackPolicy {
    progress: ProgressStore,
    analytics: AnalyticsLog,
    lessons: Arc<dyn LessonSource>,
}

impl FeedbackPolicy {
    pub fn new(
        progress: ProgressStore,
        analytics: AnalyticsLog,
        lessons: Arc<dyn LessonSource>,
    ) -> Self {
        Self {
            progress,
            analytics,
            lessons,
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn analytics(&self) -> &AnalyticsLog {
        &self.analytics
    }

    /// Records the mistake and picks the next directive for this problem.
    pub async fn handle_incorrect(&self, problem: &Problem) -> FeedbackDirective {
        let attempt = self.progress.increment_mistakes(&problem.id);
        for concept_id in &problem.concept_ids {
            self.progress.increment_concept_mistakes(concept_id);
        }

        self.analytics
            .record(EventKind::WrongAnswer, attempt_fields(problem, attempt));

        let directive = self.escalate(problem, attempt).await;

        FEEDBACK_DIRECTIVES_TOTAL
            .with_label_values(&[directive.tier()])
            .inc();
        tracing::debug!(
            question_id = %problem.id,
            attempt,
            tier = directive.tier(),
            "Feedback directive selected"
        );

        directive
    }

    async fn escalate(&self, problem: &Problem, attempt: u32) -> FeedbackDirective {
        let hint_index = self.progress.hint_index(&problem.id) as usize;
        if let Some(hint) = problem.hints.get(hint_index) {
            self.progress.increment_hint_index(&problem.id);
            self.analytics.record(
                EventKind::HintViewed,
                attempt_fields(problem, attempt).with_metadata(json!({ "hintIndex": hint_index })),
            );
            return FeedbackDirective::ShowHint {
                hint: hint.clone(),
                hint_index,
            };
        }

        if let Some(concept_id) = problem.primary_concept() {
            if let Some(lesson) = self.lookup_lesson(concept_id).await {
                self.analytics
                    .record(EventKind::LessonOpened, attempt_fields(problem, attempt));
                return FeedbackDirective::ShowLesson { lesson };
            }
        }

        if !problem.solution_steps.is_empty() {
            self.analytics
                .record(EventKind::SolutionViewed, attempt_fields(problem, attempt));
            return FeedbackDirective::ShowSolution {
                steps: problem.solution_steps.clone(),
            };
        }

        FeedbackDirective::ShowMessage {
            message: GENERIC_MESSAGE.to_string(),
        }
    }

    async fn lookup_lesson(&self, concept_id: &str) -> Option<Lesson> {
        match self.lessons.lesson_for_concept(concept_id).await {
            Ok(Some(lesson)) => {
                LESSON_LOOKUPS_TOTAL.with_label_values(&["found"]).inc();
                Some(lesson)
            }
            Ok(None) => {
                LESSON_LOOKUPS_TOTAL.with_label_values(&["missing"]).inc();
                None
            }
            Err(e) => {
                LESSON_LOOKUPS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!("Lesson lookup for {} failed: {:#}", concept_id, e);
                None
            }
        }
    }

    /// Records a correct answer; the attempt number counts prior mistakes.
    pub fn handle_correct(&self, problem: &Problem) -> u32 {
        let attempt = self.progress.mistakes(&problem.id) + 1;
        self.analytics
            .record(EventKind::CorrectAnswer, attempt_fields(problem, attempt));
        attempt
    }

    pub fn complete_lesson(&self, concept_id: &str) {
        self.progress.mark_lesson_viewed(concept_id);
        self.analytics.record(
            EventKind::LessonCompleted,
            EventFields::default().with_concept(Some(concept_id)),
        );
    }
}

fn attempt_fields(problem: &Problem, attempt: u32) -> EventFields {
    EventFields::question(problem.id.as_str())
        .with_concept(problem.primary_concept())
        .with_attempt(attempt)
}
