//! Configuration file and provider construction.
//!
//! The file is TOML.  Everything is optional; an absent file yields the
//! defaults below, which enable the three hosted providers if their API keys
//! are present in the environment.
//!
//! ```toml
//! [feed]
//! query = "travel"
//! query_kind = "hashtag"      # search | hashtag | category
//! threshold = 5
//! fetch_timeout_secs = 12
//!
//! [feed.backoff]
//! immediate_retries = 2
//! base_delay_ms = 1000
//! max_delay_secs = 60
//! give_up_after = 5
//!
//! [[providers]]
//! kind = "pexels"
//! api_key_env = "PEXELS_API_KEY"
//! per_page = 10
//!
//! [[providers]]
//! kind = "rss"
//! url = "https://example.com/videos.rss"
//! label = "Example"
//! ```
//!
//! Keys never live in the file itself, only the names of the environment
//! variables holding them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::feed::{BackoffPolicy, DEFAULT_THRESHOLD};
use crate::source::{
    ContentProvider, InstagramReelsProvider, PexelsProvider, ProviderQuery, RssMediaProvider,
    YoutubeShortsProvider,
};

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG_PATH: &str = "REELSCROLL_CONFIG";
/// Looked up in the working directory when [`ENV_CONFIG_PATH`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "reelscroll.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no usable content provider (set an API key or add an rss provider)")]
    NoProviders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    #[default]
    Search,
    Hashtag,
    Category,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub immediate_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
    pub give_up_after: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            immediate_retries: policy.immediate_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_secs: policy.max_delay.as_secs(),
            give_up_after: policy.give_up_after,
        }
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(c: &BackoffConfig) -> Self {
        BackoffPolicy {
            immediate_retries: c.immediate_retries,
            base_delay: Duration::from_millis(c.base_delay_ms),
            max_delay: Duration::from_secs(c.max_delay_secs),
            give_up_after: c.give_up_after,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub query: String,
    pub query_kind: QueryKind,
    /// Remaining-item count that triggers the next page.
    pub threshold: usize,
    pub fetch_timeout_secs: u64,
    pub backoff: BackoffConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            query: "travel".into(),
            query_kind: QueryKind::default(),
            threshold: DEFAULT_THRESHOLD,
            fetch_timeout_secs: 12,
            backoff: BackoffConfig::default(),
        }
    }
}

impl FeedConfig {
    /// The configured query, or `term` in its place when given.
    pub fn query(&self, term: Option<&str>) -> ProviderQuery {
        let term = term.unwrap_or(&self.query).to_string();
        match self.query_kind {
            QueryKind::Search => ProviderQuery::Search(term),
            QueryKind::Hashtag => ProviderQuery::Hashtag(term),
            QueryKind::Category => ProviderQuery::Category(term),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_pexels_env() -> String {
    "PEXELS_API_KEY".into()
}

fn default_serpapi_env() -> String {
    "SERPAPI_API_KEY".into()
}

fn default_rapidapi_env() -> String {
    "RAPIDAPI_KEY".into()
}

fn default_per_page() -> u32 {
    10
}

fn default_max_duration() -> u32 {
    60
}

fn default_count() -> u32 {
    20
}

fn default_rss_label() -> String {
    "rss".into()
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Pexels {
        #[serde(default = "default_pexels_env")]
        api_key_env: String,
        #[serde(default = "default_per_page")]
        per_page: u32,
    },
    Youtube {
        #[serde(default = "default_serpapi_env")]
        api_key_env: String,
        #[serde(default = "default_max_duration")]
        max_duration_secs: u32,
    },
    Instagram {
        #[serde(default = "default_rapidapi_env")]
        api_key_env: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Rss {
        url: String,
        #[serde(default = "default_rss_label")]
        label: String,
    },
}

impl ProviderConfig {
    fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Pexels { .. } => "pexels",
            ProviderConfig::Youtube { .. } => "youtube",
            ProviderConfig::Instagram { .. } => "instagram",
            ProviderConfig::Rss { .. } => "rss",
        }
    }

    /// Build the adapter, or `None` when its API key is not available.
    ///
    /// `env` resolves an environment variable name to its value.
    pub fn build(
        &self,
        timeout: Duration,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<Arc<dyn ContentProvider>> {
        let key = |var: &str| {
            let value = env(var).filter(|v| !v.trim().is_empty());
            if value.is_none() {
                tracing::warn!(provider = self.name(), var, "API key not set, provider disabled");
            }
            value
        };

        let provider: Arc<dyn ContentProvider> = match self {
            ProviderConfig::Pexels { api_key_env, per_page } => {
                Arc::new(PexelsProvider::new(key(api_key_env.as_str())?, *per_page, timeout))
            }
            ProviderConfig::Youtube {
                api_key_env,
                max_duration_secs,
            } => Arc::new(YoutubeShortsProvider::new(
                key(api_key_env.as_str())?,
                *max_duration_secs,
                timeout,
            )),
            ProviderConfig::Instagram { api_key_env, count } => {
                Arc::new(InstagramReelsProvider::new(key(api_key_env.as_str())?, *count, timeout))
            }
            ProviderConfig::Rss { url, label } => {
                Arc::new(RssMediaProvider::new(url, label, timeout))
            }
        };
        Some(provider)
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::Pexels {
            api_key_env: default_pexels_env(),
            per_page: default_per_page(),
        },
        ProviderConfig::Youtube {
            api_key_env: default_serpapi_env(),
            max_duration_secs: default_max_duration(),
        },
        ProviderConfig::Instagram {
            api_key_env: default_rapidapi_env(),
            count: default_count(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            providers: default_providers(),
        }
    }
}

impl Config {
    /// Load from `$REELSCROLL_CONFIG`, else `./reelscroll.toml`, else defaults.
    ///
    /// An explicitly named file must exist; the default path may be absent.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    tracing::info!("no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::from(&self.feed.backoff)
    }

    /// Adapters for every configured provider whose credentials resolve.
    pub fn build_providers(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<Arc<dyn ContentProvider>>, ConfigError> {
        let timeout = self.feed.fetch_timeout();
        let providers: Vec<_> = self
            .providers
            .iter()
            .filter_map(|p| p.build(timeout, &env))
            .collect();
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        Ok(providers)
    }
}
