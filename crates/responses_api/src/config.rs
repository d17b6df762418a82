use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::url::DEFAULT_BASE_URL;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_ORGANIZATION: &str = "OPENAI_ORG_ID";
pub const ENV_PROJECT: &str = "OPENAI_PROJECT_ID";
pub const ENV_LOG_REQUESTS: &str = "OPENAI_LOG_REQUESTS";

/// Transport configuration for Responses API requests.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token passed to `Authorization`.
    pub api_key: String,
    /// Base URL all endpoint paths are joined onto.
    pub base_url: String,
    /// Optional `OpenAI-Organization` header value.
    pub organization: Option<String>,
    /// Optional `OpenAI-Project` header value.
    pub project: Option<String>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
    /// Dump full requests and responses at debug level.
    pub log_requests: bool,
    /// Turn request logging on after a failure and off after a success.
    pub auto_log: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
            project: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            retry: RetryPolicy::default(),
            log_requests: false,
            auto_log: false,
        }
    }
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build a config from `OPENAI_*` environment variables.
    ///
    /// Missing variables keep their defaults. The API key is checked when a
    /// `Transport` is built from the config, not here.
    pub fn from_env() -> Self {
        let mut config = Self::new(env_string_opt(ENV_API_KEY).unwrap_or_default());
        if let Some(base_url) = env_string_opt(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        config.organization = env_string_opt(ENV_ORGANIZATION);
        config.project = env_string_opt(ENV_PROJECT);
        config.log_requests = env_flag(ENV_LOG_REQUESTS);
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_auto_log(mut self, enabled: bool) -> Self {
        self.auto_log = enabled;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
