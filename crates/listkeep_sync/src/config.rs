//! Configuration for the sync backends.

use std::time::Duration;

/// Application name written into backup labels and file names.
pub const DEFAULT_APP_NAME: &str = "ListKeep";

/// Public Gist API endpoint.
pub const DEFAULT_GIST_API: &str = "https://api.github.com";

/// Versioned media type the Gist API expects.
pub const GIST_ACCEPT: &str = "application/vnd.github.v3+json";

/// Largest value the cloud key-value store accepts under one key.
pub const KV_MAX_VALUE_BYTES: usize = 1_000_000;

/// Total budget of the cloud key-value store across all keys.
pub const KV_TOTAL_BUDGET_BYTES: usize = 1_048_576;

/// Configuration for the remote Gist backend.
#[derive(Debug, Clone)]
pub struct GistConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Application name used for the backup label and file name.
    pub app_name: String,
    /// Value of the `Accept` header.
    pub accept: String,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Page size requested when listing documents.
    pub per_page: u32,
    /// Request timeout.
    pub timeout: Duration,
}

impl GistConfig {
    /// Creates a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            accept: GIST_ACCEPT.to_string(),
            user_agent: format!("listkeep/{}", env!("CARGO_PKG_VERSION")),
            per_page: 100,
            timeout: Duration::from_secs(30),
        }
    }

    /// Creates a configuration from environment variables.
    ///
    /// - `LISTKEEP_GIST_API`: API base URL (default: the public API)
    /// - `LISTKEEP_GIST_TIMEOUT`: timeout in seconds (default: 30)
    /// - `LISTKEEP_GIST_PER_PAGE`: listing page size (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("LISTKEEP_GIST_API").unwrap_or_else(|| DEFAULT_GIST_API.to_string());

        let mut config = Self::new(base_url);

        if let Some(secs) = lookup("LISTKEEP_GIST_TIMEOUT").and_then(|s| s.parse().ok()) {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        if let Some(per_page) = lookup("LISTKEEP_GIST_PER_PAGE").and_then(|s| s.parse().ok()) {
            config = config.with_per_page(per_page);
        }

        config
    }

    /// Sets the application name.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Sets the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the listing page size. Values are clamped to 1..=100.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for GistConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GIST_API)
    }
}

/// Configuration for the cloud key-value backend.
#[derive(Debug, Clone)]
pub struct CloudKvConfig {
    /// Prefix of the per-user snapshot key.
    pub key_prefix: String,
    /// Per-key value limit in bytes.
    pub max_value_bytes: usize,
    /// Total store budget in bytes, reported by storage usage.
    pub total_budget_bytes: usize,
    /// Application name, used in log fields.
    pub app_name: String,
}

impl CloudKvConfig {
    /// Creates a configuration with the store's documented limits.
    pub fn new() -> Self {
        Self {
            key_prefix: "appData_".to_string(),
            max_value_bytes: KV_MAX_VALUE_BYTES,
            total_budget_bytes: KV_TOTAL_BUDGET_BYTES,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// Sets the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the per-key limit.
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = limit;
        self
    }

    /// Sets the total budget.
    pub fn with_total_budget_bytes(mut self, budget: usize) -> Self {
        self.total_budget_bytes = budget;
        self
    }

    /// Sets the application name.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }
}

impl Default for CloudKvConfig {
    fn default() -> Self {
        Self::new()
    }
}
