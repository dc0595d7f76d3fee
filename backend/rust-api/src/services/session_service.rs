use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::feedback_policy::FeedbackPolicy;
use super::problem_source::{load_problems, ProblemSource};
use super::quiz_session::QuizSession;
use crate::error::QuizError;
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::models::answer::{AnswerOutcome, SubmitAnswerResponse};
use crate::models::{CreateSessionResponse, HelpResponse, SessionView};

pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

type SharedSession = Arc<Mutex<QuizSession>>;

struct SessionSlot {
    session: SharedSession,
    last_active: Instant,
}

/// In-memory registry of quiz sessions.
///
/// The registry lock is only held to find, insert or evict a session. Each
/// session has its own lock, held for the whole operation (lesson lookups
/// included), so one learner's actions apply in order without stalling
/// anyone else. Sessions idle for longer than the TTL are evicted on the
/// next registry access.
pub struct SessionService {
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    problems: Arc<dyn ProblemSource>,
    policy: FeedbackPolicy,
    fallback_count: usize,
    points_per_question: u32,
    ttl: Duration,
}

impl SessionService {
    pub fn new(
        problems: Arc<dyn ProblemSource>,
        policy: FeedbackPolicy,
        fallback_count: usize,
        points_per_question: u32,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            problems,
            policy,
            fallback_count,
            points_per_question,
            ttl,
        }
    }

    pub fn policy(&self) -> &FeedbackPolicy {
        &self.policy
    }

    pub async fn create_session(&self) -> CreateSessionResponse {
        let loaded = load_problems(self.problems.as_ref(), self.fallback_count).await;
        let session = QuizSession::new(loaded.problems, loaded.origin);
        let session_id = session.id();
        let view = session.view(self.points_per_question);

        {
            let mut sessions = self.sessions.lock().await;
            self.evict_expired(&mut sessions);
            sessions.insert(
                session_id,
                SessionSlot {
                    session: Arc::new(Mutex::new(session)),
                    last_active: Instant::now(),
                },
            );
        }

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(
            %session_id,
            origin = loaded.origin.as_str(),
            problems = view.total_problems,
            "Session created"
        );

        CreateSessionResponse {
            session_id,
            total_problems: view.total_problems,
            origin: loaded.origin,
            session: view,
        }
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<SessionView, QuizError> {
        let session = self.find(session_id).await?;
        let session = session.lock().await;
        Ok(session.view(self.points_per_question))
    }

    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        answer: &str,
    ) -> Result<SubmitAnswerResponse, QuizError> {
        let session = self.find(session_id).await?;
        let mut session = session.lock().await;

        let was_over = session.is_over();
        let outcome = session.submit(answer, &self.policy).await?;

        if outcome.outcome != AnswerOutcome::Ignored {
            let correct = outcome.outcome == AnswerOutcome::Correct;
            ANSWERS_SUBMITTED_TOTAL
                .with_label_values(&[if correct { "true" } else { "false" }])
                .inc();
        }
        if !was_over && session.is_over() {
            SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
            tracing::info!(%session_id, score = session.score(), "Session completed");
        }

        Ok(SubmitAnswerResponse {
            correct: outcome.outcome == AnswerOutcome::Correct,
            outcome: outcome.outcome,
            score: session.score(),
            current_index: session.current_index(),
            total_problems: session.total_problems(),
            is_over: session.is_over(),
            attempt_number: outcome.attempt_number,
            directive: outcome.directive,
            answer_feedback: outcome.answer_feedback,
            error_analysis: outcome.error_analysis,
        })
    }

    pub async fn request_help(&self, session_id: Uuid) -> Result<HelpResponse, QuizError> {
        let session = self.find(session_id).await?;
        let mut session = session.lock().await;

        let directive = session.request_help(self.policy.analytics());
        Ok(HelpResponse {
            directive,
            session: session.view(self.points_per_question),
        })
    }

    pub async fn skip(&self, session_id: Uuid) -> Result<SessionView, QuizError> {
        self.with_session(session_id, |session, policy| {
            session.skip(policy.analytics())
        })
        .await
    }

    pub async fn retry(&self, session_id: Uuid) -> Result<SessionView, QuizError> {
        self.with_session(session_id, |session, policy| {
            session.retry(policy.analytics())
        })
        .await
    }

    pub async fn reset(&self, session_id: Uuid) -> Result<SessionView, QuizError> {
        self.with_session(session_id, |session, _| session.reset())
            .await
    }

    pub async fn delete_session(&self, session_id: Uuid) -> Result<(), QuizError> {
        let removed = {
            let mut sessions = self.sessions.lock().await;
            self.evict_expired(&mut sessions);
            sessions.remove(&session_id)
        };
        if removed.is_none() {
            return Err(QuizError::SessionNotFound(session_id));
        }

        SESSIONS_ACTIVE.dec();
        SESSIONS_TOTAL.with_label_values(&["deleted"]).inc();
        tracing::info!(%session_id, "Session deleted");
        Ok(())
    }

    pub async fn active_sessions(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        self.evict_expired(&mut sessions);
        sessions.len()
    }

    /// Looks the session up and refreshes its idle timer.
    async fn find(&self, session_id: Uuid) -> Result<SharedSession, QuizError> {
        let mut sessions = self.sessions.lock().await;
        self.evict_expired(&mut sessions);

        let slot = sessions
            .get_mut(&session_id)
            .ok_or(QuizError::SessionNotFound(session_id))?;
        slot.last_active = Instant::now();
        Ok(slot.session.clone())
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, SessionSlot>) {
        let before = sessions.len();
        sessions.retain(|session_id, slot| {
            let alive = slot.last_active.elapsed() < self.ttl;
            if !alive {
                tracing::info!(%session_id, "Session expired");
            }
            alive
        });

        let expired = before - sessions.len();
        if expired > 0 {
            SESSIONS_ACTIVE.sub(expired as i64);
            SESSIONS_TOTAL
                .with_label_values(&["expired"])
                .inc_by(expired as u64);
        }
    }

    async fn with_session<F>(&self, session_id: Uuid, action: F) -> Result<SessionView, QuizError>
    where
        F: FnOnce(&mut QuizSession, &FeedbackPolicy),
    {
        let session = self.find(session_id).await?;
        let mut session = session.lock().await;

        action(&mut *session, &self.policy);
        Ok(session.view(self.points_per_question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lesson::Lesson;
    use crate::models::problem::Problem;
    use crate::models::ProblemOrigin;
    use crate::services::analytics_log::{AnalyticsLog, DEFAULT_MAX_EVENTS};
    use crate::services::feedback_policy::LessonSource;
    use crate::services::kv_store::{shared, MemoryStore};
    use crate::services::problem_generator::derivative_problem;
    use crate::services::progress_store::ProgressStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    struct FixedProblems(Vec<Problem>);

    #[async_trait]
    impl ProblemSource for FixedProblems {
        async fn fetch_problems(&self) -> anyhow::Result<Vec<Problem>> {
            Ok(self.0.clone())
        }
    }

    struct NoLessons;

    #[async_trait]
    impl LessonSource for NoLessons {
        async fn lesson_for_concept(&self, _concept_id: &str) -> anyhow::Result<Option<Lesson>> {
            Ok(None)
        }
    }

    /// Signals when a lookup starts, then waits to be released.
    struct GatedLessons {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl LessonSource for GatedLessons {
        async fn lesson_for_concept(&self, _concept_id: &str) -> anyhow::Result<Option<Lesson>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(None)
        }
    }

    const TTL: Duration = Duration::from_secs(DEFAULT_SESSION_TTL_SECS);

    fn service_with(
        problems: Vec<Problem>,
        lessons: impl LessonSource + 'static,
        ttl: Duration,
    ) -> SessionService {
        let store = shared(MemoryStore::default());
        let policy = FeedbackPolicy::new(
            ProgressStore::new(store.clone()),
            AnalyticsLog::new(store, DEFAULT_MAX_EVENTS),
            Arc::new(lessons),
        );
        SessionService::new(Arc::new(FixedProblems(problems)), policy, 3, 10, ttl)
    }

    fn service(problems: Vec<Problem>) -> SessionService {
        service_with(problems, NoLessons, TTL)
    }

    fn concept_problem() -> Problem {
        Problem {
            id: "c1".to_string(),
            question: "What is the derivative of x^2?".to_string(),
            answer: "2x".to_string(),
            topic: None,
            concept_ids: vec!["power-rule".to_string()],
            hints: Vec::new(),
            solution_steps: Vec::new(),
            lesson_topic: None,
            lesson_url: None,
        }
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let service = service(vec![derivative_problem(1, 2, 1)]);

        let created = service.create_session().await;
        assert_eq!(created.origin, ProblemOrigin::Source);
        assert_eq!(created.total_problems, 1);
        assert_eq!(service.active_sessions().await, 1);

        let response = service.submit_answer(created.session_id, "2").await.unwrap();
        assert!(response.correct);
        assert!(response.is_over);

        let view = service.get_session(created.session_id).await.unwrap();
        assert_eq!(view.points, 10);
        assert_eq!(view.completion_percentage, 100.0);

        service.delete_session(created.session_id).await.unwrap();
        assert!(matches!(
            service.get_session(created.session_id).await,
            Err(QuizError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_source_uses_fallback_count() {
        let service = service(Vec::new());
        let created = service.create_session().await;
        assert_eq!(created.origin, ProblemOrigin::Fallback);
        assert_eq!(created.total_problems, 3);
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let service = service(Vec::new());
        let missing = Uuid::new_v4();
        assert!(matches!(
            service.skip(missing).await,
            Err(QuizError::SessionNotFound(id)) if id == missing
        ));
        assert!(service.delete_session(missing).await.is_err());
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let service = service_with(vec![derivative_problem(1, 2, 1)], NoLessons, Duration::ZERO);

        let created = service.create_session().await;

        assert!(matches!(
            service.get_session(created.session_id).await,
            Err(QuizError::SessionNotFound(_))
        ));
        assert_eq!(service.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn active_sessions_are_kept_within_ttl() {
        let service = service(vec![derivative_problem(1, 2, 1)]);

        let first = service.create_session().await;
        let second = service.create_session().await;

        assert!(service.get_session(first.session_id).await.is_ok());
        assert!(service.get_session(second.session_id).await.is_ok());
        assert_eq!(service.active_sessions().await, 2);
    }

    #[tokio::test]
    async fn slow_lesson_lookup_only_blocks_its_own_session() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let service = Arc::new(service_with(
            vec![concept_problem()],
            GatedLessons {
                entered: entered.clone(),
                release: release.clone(),
            },
            TTL,
        ));
        let stuck = service.create_session().await.session_id;
        let other = service.create_session().await.session_id;

        let submit = tokio::spawn({
            let service = service.clone();
            async move { service.submit_answer(stuck, "3x").await }
        });
        entered.notified().await;

        let view = timeout(Duration::from_secs(1), service.get_session(other))
            .await
            .expect("other session blocked by lesson lookup")
            .unwrap();
        assert_eq!(view.current_index, 0);
        let active = timeout(Duration::from_secs(1), service.active_sessions())
            .await
            .expect("registry blocked by lesson lookup");
        assert_eq!(active, 2);

        // The learner's own session waits for the submit to finish
        assert!(timeout(Duration::from_millis(50), service.get_session(stuck))
            .await
            .is_err());

        release.notify_one();
        let response = submit.await.unwrap().unwrap();
        assert!(!response.correct);
        assert_eq!(response.attempt_number, Some(1));
    }
}
