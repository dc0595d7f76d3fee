use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use analytics_log::AnalyticsLog;
use content_service::{ChainedSource, FileContentRepository, HttpContentClient};
use feedback_policy::{FeedbackPolicy, LessonSource};
use kv_store::{shared, FileStore, SharedStore};
use problem_source::ProblemSource;
use progress_store::ProgressStore;
use session_service::SessionService;

pub mod analytics_log;
pub mod answer_normalizer;
pub mod content_service;
pub mod feedback_policy;
pub mod kv_store;
pub mod mistake_analysis;
pub mod problem_generator;
pub mod problem_source;
pub mod progress_store;
pub mod quiz_session;
pub mod session_service;

pub struct AppState {
    pub config: Config,
    pub content: FileContentRepository,
    pub sessions: SessionService,
}

impl AppState {
    /// Wires the services for `config`, keeping learner state in `config.state_file`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = shared(FileStore::open(&config.state_file));
        tracing::info!("Learner state file: {}", config.state_file.display());
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: SharedStore) -> anyhow::Result<Self> {
        let content = FileContentRepository::new(&config.data_dir);
        let local_problems: Arc<dyn ProblemSource> = Arc::new(content.clone());
        let local_lessons: Arc<dyn LessonSource> = Arc::new(content.clone());

        let (problems, lessons): (Arc<dyn ProblemSource>, Arc<dyn LessonSource>) =
            match &config.content_api_url {
                Some(url) => {
                    let remote = HttpContentClient::new(
                        url,
                        Duration::from_secs(config.http_timeout_secs),
                    )
                    .context("Failed to initialize remote content client")?;
                    tracing::info!("Remote content API: {}", url);

                    let remote_problems: Arc<dyn ProblemSource> = Arc::new(remote.clone());
                    let remote_lessons: Arc<dyn LessonSource> = Arc::new(remote);
                    let problems: Arc<dyn ProblemSource> =
                        Arc::new(ChainedSource::new(remote_problems, local_problems));
                    let lessons: Arc<dyn LessonSource> =
                        Arc::new(ChainedSource::new(remote_lessons, local_lessons));
                    (problems, lessons)
                }
                None => (local_problems, local_lessons),
            };

        let policy = FeedbackPolicy::new(
            ProgressStore::new(store.clone()),
            AnalyticsLog::new(store, config.analytics_max_events),
            lessons,
        );
        let sessions = SessionService::new(
            problems,
            policy,
            config.fallback_problem_count,
            config.points_per_question,
            Duration::from_secs(config.session_ttl_secs),
        );

        Ok(Self {
            config,
            content,
            sessions,
        })
    }

    pub fn progress(&self) -> &ProgressStore {
        self.sessions.policy().progress()
    }

    pub fn analytics(&self) -> &AnalyticsLog {
        self.sessions.policy().analytics()
    }

    pub fn policy(&self) -> &FeedbackPolicy {
        self.sessions.policy()
    }
}
