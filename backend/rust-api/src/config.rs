use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::services::analytics_log::DEFAULT_MAX_EVENTS;
use crate::services::problem_generator::DEFAULT_PROBLEM_COUNT;
use crate::services::session_service::DEFAULT_SESSION_TTL_SECS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const STATE_FILE_NAME: &str = "progress.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_POINTS_PER_QUESTION: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// Directory holding problems.json, lessons.json and topics.json.
    pub data_dir: PathBuf,
    /// Learner progress and analytics, one JSON document.
    pub state_file: PathBuf,
    /// Base URL of a remote content API; local files are used when unset.
    pub content_api_url: Option<String>,
    pub http_timeout_secs: u64,
    pub analytics_max_events: usize,
    pub fallback_problem_count: usize,
    pub points_per_question: u32,
    /// Idle time after which a quiz session is dropped.
    pub session_ttl_secs: u64,
    pub log_json: bool,
    /// `username:password` guarding /metrics; open when unset.
    pub metrics_auth: Option<String>,
}

impl Config {
    /// Defaults rooted at `data_dir`, with the state file inside it.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            state_file: data_dir.join(STATE_FILE_NAME),
            data_dir,
            content_api_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            analytics_max_events: DEFAULT_MAX_EVENTS,
            fallback_problem_count: DEFAULT_PROBLEM_COUNT,
            points_per_question: DEFAULT_POINTS_PER_QUESTION,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            log_json: false,
            metrics_auth: None,
        }
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{APP_ENV}.toml + APP__* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let data_dir = settings
            .get_string("content.data_dir")
            .or_else(|_| env::var("DATA_DIR"))
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());

        let mut config = Config::with_data_dir(data_dir);
        config.bind_addr = bind_addr;

        if let Some(state_file) = settings
            .get_string("progress.state_file")
            .or_else(|_| env::var("STATE_FILE"))
            .ok()
        {
            config.state_file = PathBuf::from(state_file);
        }

        config.content_api_url = settings
            .get_string("content.api_url")
            .or_else(|_| env::var("CONTENT_API_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        config.http_timeout_secs = read_number(&settings, "content.http_timeout_secs", "HTTP_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .max(1);

        config.analytics_max_events =
            read_number(&settings, "analytics.max_events", "ANALYTICS_MAX_EVENTS")?
                .map(|v| narrow::<usize>(v, "analytics.max_events"))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_EVENTS)
                .max(1);

        config.fallback_problem_count =
            read_number(&settings, "quiz.fallback_problem_count", "FALLBACK_PROBLEM_COUNT")?
                .map(|v| narrow::<usize>(v, "quiz.fallback_problem_count"))
                .transpose()?
                .unwrap_or(DEFAULT_PROBLEM_COUNT)
                .max(1);

        config.points_per_question =
            read_number(&settings, "quiz.points_per_question", "POINTS_PER_QUESTION")?
                .map(|v| narrow::<u32>(v, "quiz.points_per_question"))
                .transpose()?
                .unwrap_or(DEFAULT_POINTS_PER_QUESTION);

        config.session_ttl_secs =
            read_number(&settings, "quiz.session_ttl_secs", "SESSION_DURATION_SECONDS")?
                .unwrap_or(DEFAULT_SESSION_TTL_SECS)
                .max(1);

        config.log_json = settings
            .get_bool("logging.json")
            .ok()
            .or_else(|| env::var("LOG_JSON").ok().map(|v| v == "true" || v == "1"))
            .unwrap_or(false);

        config.metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .ok()
            .filter(|auth| auth.contains(':'));

        Ok(config)
    }
}

/// Reads a non-negative integer from settings, then from a plain env var.
fn read_number(
    settings: &config::Config,
    key: &str,
    env_key: &str,
) -> Result<Option<u64>, config::ConfigError> {
    if let Ok(value) = settings.get_int(key) {
        return u64::try_from(value)
            .map(Some)
            .map_err(|_| config::ConfigError::Message(format!("{} must not be negative", key)));
    }

    match env::var(env_key) {
        Ok(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            config::ConfigError::Message(format!("{} is not a valid number: {}", env_key, e))
        }),
        Err(_) => Ok(None),
    }
}

fn narrow<T: TryFrom<u64>>(value: u64, key: &str) -> Result<T, config::ConfigError> {
    T::try_from(value)
        .map_err(|_| config::ConfigError::Message(format!("{} is out of range: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "DATA_DIR",
        "STATE_FILE",
        "CONTENT_API_URL",
        "POINTS_PER_QUESTION",
        "SESSION_DURATION_SECONDS",
        "ANALYTICS_MAX_EVENTS",
        "METRICS_AUTH",
        "APP__QUIZ__FALLBACK_PROBLEM_COUNT",
    ];

    fn clear_env() {
        env::set_var("SKIP_ROOT_ENV", "1");
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_when_nothing_is_configured() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");

        let config = Config::load().unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.state_file, PathBuf::from("data").join("progress.json"));
        assert!(config.content_api_url.is_none());
        assert_eq!(config.points_per_question, 10);
        assert_eq!(config.analytics_max_events, 1000);
        assert_eq!(config.fallback_problem_count, 10);
        assert!(config.metrics_auth.is_none());
        assert_eq!(config.session_ttl_secs, 3600);
        clear_env();
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("DATA_DIR", "/srv/quiz");
        env::set_var("CONTENT_API_URL", "http://content:3001");
        env::set_var("POINTS_PER_QUESTION", "5");
        env::set_var("ANALYTICS_MAX_EVENTS", "0");
        env::set_var("METRICS_AUTH", "ops:secret");
        env::set_var("APP__QUIZ__FALLBACK_PROBLEM_COUNT", "4");

        let config = Config::load().unwrap();
        assert_eq!(config.state_file, PathBuf::from("/srv/quiz/progress.json"));
        assert_eq!(config.content_api_url.as_deref(), Some("http://content:3001"));
        assert_eq!(config.points_per_question, 5);
        assert_eq!(config.analytics_max_events, 1);
        assert_eq!(config.fallback_problem_count, 4);
        assert_eq!(config.metrics_auth.as_deref(), Some("ops:secret"));
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_malformed_numbers() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("POINTS_PER_QUESTION", "ten");

        assert!(Config::load().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_numbers_that_do_not_fit() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("POINTS_PER_QUESTION", "4294967306");

        let err = Config::load().unwrap_err();
        assert!(err.to_string().contains("quiz.points_per_question"));
        clear_env();
    }

    #[test]
    #[serial]
    fn session_ttl_from_environment() {
        clear_env();
        env::set_var("APP_ENV", "config-test-missing");
        env::set_var("SESSION_DURATION_SECONDS", "600");

        assert_eq!(Config::load().unwrap().session_ttl_secs, 600);
        clear_env();
    }
}
