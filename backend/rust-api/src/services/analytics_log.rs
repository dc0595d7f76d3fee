use chrono::Utc;

use super::kv_store::{lock, SharedStore};
use crate::metrics::ANALYTICS_EVENTS_TOTAL;
use crate::models::analytics::{AnalyticsEvent, AnalyticsMetrics, EventFields, EventKind};

const ANALYTICS_KEY: &str = "calculus_game_analytics";
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Bounded, append-only log of learner interactions. The oldest entries are
/// dropped once the cap is reached.
#[derive(Clone)]
pub struct AnalyticsLog {
    store: SharedStore,
    max_events: usize,
}

impl AnalyticsLog {
    pub fn new(store: SharedStore, max_events: usize) -> Self {
        Self {
            store,
            max_events: max_events.max(1),
        }
    }

    fn events(&self) -> Vec<AnalyticsEvent> {
        let raw = lock(&self.store).get(ANALYTICS_KEY);
        decode(raw)
    }

    pub fn record(&self, kind: EventKind, fields: EventFields) -> AnalyticsEvent {
        let event = AnalyticsEvent {
            event: kind,
            timestamp: Utc::now(),
            question_id: fields.question_id,
            concept_id: fields.concept_id,
            attempt_number: fields.attempt_number,
            metadata: fields.metadata,
        };

        tracing::info!(
            kind = %kind,
            question_id = ?event.question_id,
            concept_id = ?event.concept_id,
            attempt = ?event.attempt_number,
            "Analytics event recorded"
        );
        ANALYTICS_EVENTS_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();

        let mut store = lock(&self.store);
        let mut events = decode(store.get(ANALYTICS_KEY));
        events.push(event.clone());
        if events.len() > self.max_events {
            let overflow = events.len() - self.max_events;
            events.drain(..overflow);
        }

        match serde_json::to_string(&events) {
            Ok(encoded) => {
                if let Err(e) = store.set(ANALYTICS_KEY, encoded) {
                    tracing::error!("Failed to persist analytics log: {:#}", e);
                }
            }
            Err(e) => tracing::error!("Failed to encode analytics log: {}", e),
        }

        event
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last `count` events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<AnalyticsEvent> {
        let mut events = self.events();
        let skip = events.len().saturating_sub(count);
        events.drain(..skip);
        events
    }

    pub fn events_by_kind(&self, kind: EventKind) -> Vec<AnalyticsEvent> {
        self.filtered(|event| event.event == kind)
    }

    pub fn events_by_question(&self, question_id: &str) -> Vec<AnalyticsEvent> {
        self.filtered(|event| event.question_id.as_deref() == Some(question_id))
    }

    pub fn events_by_concept(&self, concept_id: &str) -> Vec<AnalyticsEvent> {
        self.filtered(|event| event.concept_id.as_deref() == Some(concept_id))
    }

    fn filtered(&self, predicate: impl Fn(&AnalyticsEvent) -> bool) -> Vec<AnalyticsEvent> {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }

    pub fn clear(&self) {
        if let Err(e) = lock(&self.store).remove_all(&[ANALYTICS_KEY]) {
            tracing::error!("Failed to clear analytics log: {:#}", e);
        }
    }

    pub fn metrics(&self) -> AnalyticsMetrics {
        let events = self.events();
        let count = |kind: EventKind| events.iter().filter(|e| e.event == kind).count() as u32;

        let wrong_answers = count(EventKind::WrongAnswer);
        let correct_answers = count(EventKind::CorrectAnswer);
        let lessons_opened = count(EventKind::LessonOpened);
        let lessons_completed = count(EventKind::LessonCompleted);
        let total_attempts = wrong_answers + correct_answers;

        AnalyticsMetrics {
            total_attempts,
            correct_answers,
            wrong_answers,
            accuracy_rate: percentage(correct_answers, total_attempts),
            hints_viewed: count(EventKind::HintViewed),
            lessons_opened,
            lessons_completed,
            lesson_completion_rate: percentage(lessons_completed, lessons_opened),
        }
    }
}

fn decode(raw: Option<String>) -> Vec<AnalyticsEvent> {
    match raw {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable analytics log: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}
