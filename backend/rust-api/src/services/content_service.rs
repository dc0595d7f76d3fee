use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::feedback_policy::LessonSource;
use super::problem_source::ProblemSource;
use crate::metrics::track_content_fetch;
use crate::models::lesson::{Lesson, LessonCatalog};
use crate::models::problem::{Problem, ProblemPayload};
use crate::models::topic::TopicCatalog;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

pub const PROBLEMS_FILE: &str = "problems.json";
pub const LESSONS_FILE: &str = "lessons.json";
pub const TOPICS_FILE: &str = "topics.json";

/// Problem, lesson and topic documents stored as JSON files in the data
/// directory. A missing file reads as `None`; a malformed one is an error.
#[derive(Debug, Clone)]
pub struct FileContentRepository {
    data_dir: PathBuf,
}

impl FileContentRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.data_dir.join(file);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not found", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let parsed = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(parsed))
    }

    pub async fn problem_set(&self) -> Result<Option<Vec<Problem>>> {
        let payload: Option<ProblemPayload> = self.read_json(PROBLEMS_FILE).await?;
        Ok(payload.map(ProblemPayload::into_problems))
    }

    pub async fn lesson_catalog(&self) -> Result<Option<LessonCatalog>> {
        self.read_json(LESSONS_FILE).await
    }

    pub async fn topic_catalog(&self) -> Result<Option<TopicCatalog>> {
        self.read_json(TOPICS_FILE).await
    }
}

#[async_trait]
impl ProblemSource for FileContentRepository {
    async fn fetch_problems(&self) -> Result<Vec<Problem>> {
        self.problem_set()
            .await?
            .ok_or_else(|| anyhow!("{} not found in {}", PROBLEMS_FILE, self.data_dir.display()))
    }
}

#[async_trait]
impl LessonSource for FileContentRepository {
    async fn lesson_for_concept(&self, concept_id: &str) -> Result<Option<Lesson>> {
        let catalog = self.lesson_catalog().await?;
        Ok(catalog.and_then(|catalog| catalog.find_by_concept(concept_id).cloned()))
    }
}

/// Client for a remote deployment of this API serving the same content
/// routes. Failed requests are retried with backoff.
#[derive(Clone)]
pub struct HttpContentClient {
    http_client: Client,
    base_url: Url,
    retry: RetryConfig,
}

impl HttpContentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid content API URL {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Content API URL {} cannot take a path", base_url));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build content HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            retry: RetryConfig::content_fetch(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GETs `url` and decodes the body; a 404 yields `None`.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        retry_async_with_config(self.retry.clone(), || async {
            let response = self
                .http_client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("Request to {} failed", url))?;

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }

            let response = response
                .error_for_status()
                .with_context(|| format!("Content API returned an error for {}", url))?;
            let body = response
                .json::<T>()
                .await
                .with_context(|| format!("Failed to decode response from {}", url))?;
            Ok(Some(body))
        })
        .await
    }
}

#[async_trait]
impl ProblemSource for HttpContentClient {
    async fn fetch_problems(&self) -> Result<Vec<Problem>> {
        let url = self.endpoint(&["api", "games", "problems"]);
        let payload: Option<ProblemPayload> = self.get_json(url).await?;
        payload
            .map(ProblemPayload::into_problems)
            .ok_or_else(|| anyhow!("Content API has no problem set"))
    }
}

#[async_trait]
impl LessonSource for HttpContentClient {
    async fn lesson_for_concept(&self, concept_id: &str) -> Result<Option<Lesson>> {
        let url = self.endpoint(&["api", "lessons", concept_id]);
        track_content_fetch("lesson", self.get_json(url)).await
    }
}

/// Asks `primary` first and `secondary` when the primary fails or has
/// nothing to offer.
pub struct ChainedSource<T: ?Sized> {
    primary: Arc<T>,
    secondary: Arc<T>,
}

impl<T: ?Sized> ChainedSource<T> {
    pub fn new(primary: Arc<T>, secondary: Arc<T>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl LessonSource for ChainedSource<dyn LessonSource> {
    async fn lesson_for_concept(&self, concept_id: &str) -> Result<Option<Lesson>> {
        match self.primary.lesson_for_concept(concept_id).await {
            Ok(Some(lesson)) => return Ok(Some(lesson)),
            Ok(None) => {
                tracing::debug!("No remote lesson for {}, trying local catalog", concept_id)
            }
            Err(e) => tracing::warn!(
                "Remote lesson lookup for {} failed ({:#}), trying local catalog",
                concept_id,
                e
            ),
        }
        self.secondary.lesson_for_concept(concept_id).await
    }
}

#[async_trait]
impl ProblemSource for ChainedSource<dyn ProblemSource> {
    async fn fetch_problems(&self) -> Result<Vec<Problem>> {
        match self.primary.fetch_problems().await {
            Ok(problems) if !problems.is_empty() => return Ok(problems),
            Ok(_) => tracing::debug!("Remote problem set is empty, trying local file"),
            Err(e) => tracing::warn!("Remote problem fetch failed ({:#}), trying local file", e),
        }
        self.secondary.fetch_problems().await
    }
}
