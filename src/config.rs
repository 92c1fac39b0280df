/**
 * Configuration constants and settings for the viewer pipeline
 */
use std::time::Duration;
use tracing::warn;

/// Backend the browser front end talks to by default
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Namespace reported for every listed object (listings carry names only)
pub const DEFAULT_NAMESPACE: &str = "default";

/// Per-request timeout in seconds for the HTTP backend
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long a completed, fully successful aggregate may be reused for the same selection
pub const DEFAULT_AGGREGATE_TTL_SECS: u64 = 30;

/// Upper bound on listing requests in flight for one selection
pub const DEFAULT_MAX_CONCURRENT_LISTINGS: usize = 8;

/// Buffer size for each subscriber channel
pub const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 10;

/// Environment variable overriding the backend base URL
pub const BASE_URL_ENV: &str = "KUBEVIEW_BASE_URL";

/// Environment variable overriding the user agent sent to the backend
pub const USER_AGENT_ENV: &str = "KUBEVIEW_USER_AGENT";

/// What re-opening an already cached detail does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPolicy {
    /// Cache is authoritative once populated
    #[default]
    CacheForever,
    /// Re-fetch whenever a cached id is opened again; the cached entry is the fallback
    RefreshOnReopen,
}

/// Settings for the fetch orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum listing requests in flight for one run
    pub max_concurrent_listings: usize,
    /// Reuse window for completed aggregates; zero disables reuse
    pub aggregate_ttl: Duration,
    /// Keep a type's last successful listing when its fetch fails
    pub retain_on_failure: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_listings: DEFAULT_MAX_CONCURRENT_LISTINGS,
            aggregate_ttl: Duration::from_secs(DEFAULT_AGGREGATE_TTL_SECS),
            retain_on_failure: false,
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub orchestrator: OrchestratorConfig,
    pub detail_policy: DetailPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: crate::backend::USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            orchestrator: OrchestratorConfig::default(),
            detail_policy: DetailPolicy::default(),
        }
    }
}

impl ViewerConfig {
    /// Defaults with `KUBEVIEW_BASE_URL` / `KUBEVIEW_USER_AGENT` applied
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if base_url.trim().is_empty() {
                warn!("{} is set but empty, using {}", BASE_URL_ENV, config.base_url);
            } else {
                config.base_url = base_url.trim().to_string();
            }
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            if !user_agent.trim().is_empty() {
                config.user_agent = user_agent.trim().to_string();
            }
        }
        config
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_aggregate_ttl(mut self, ttl: Duration) -> Self {
        self.orchestrator.aggregate_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_retain_on_failure(mut self, retain: bool) -> Self {
        self.orchestrator.retain_on_failure = retain;
        self
    }

    #[must_use]
    pub const fn with_detail_policy(mut self, policy: DetailPolicy) -> Self {
        self.detail_policy = policy;
        self
    }
}

/// Validate configuration constants at compile time
const _: () = {
    assert!(DEFAULT_REQUEST_TIMEOUT_SECS > 0, "DEFAULT_REQUEST_TIMEOUT_SECS must be greater than 0");
    assert!(DEFAULT_MAX_CONCURRENT_LISTINGS > 0, "DEFAULT_MAX_CONCURRENT_LISTINGS must be greater than 0");
    assert!(SUBSCRIPTION_CHANNEL_CAPACITY > 0, "SUBSCRIPTION_CHANNEL_CAPACITY must be greater than 0");
};
