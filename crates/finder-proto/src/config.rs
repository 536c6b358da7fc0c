use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;
use super::protocol::ChannelKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

/// Defaults shared by every channel unless a channel overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a query is considered, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Queries shorter than this (after trimming) never hit the network.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Abort the superseded request task when a newer one is issued.
    #[serde(default = "default_abort_superseded")]
    pub abort_superseded: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Local control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    pub kind: ChannelKind,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides `search.min_query_len`.
    #[serde(default)]
    pub min_query_len: Option<usize>,
    /// Overrides `search.debounce_ms`.
    #[serde(default)]
    pub debounce_ms: Option<u64>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Number of `(query, offset)` pages kept in memory; 0 disables caching.
    #[serde(default)]
    pub cache_capacity: usize,
}

impl ChannelConfig {
    pub fn new(name: &str, kind: ChannelKind, url: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            url: url.to_string(),
            enabled: true,
            min_query_len: None,
            debounce_ms: None,
            page_size: default_page_size(),
            cache_capacity: 0,
        }
    }

    pub fn min_query_len(&self, search: &SearchConfig) -> usize {
        self.min_query_len.unwrap_or(search.min_query_len)
    }

    pub fn debounce(&self, search: &SearchConfig) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(search.debounce_ms))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            abort_superseded: default_abort_superseded(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_len() -> usize {
    3
}

fn default_abort_superseded() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("finder/{}", env!("CARGO_PKG_VERSION"))
}

fn default_http_enabled() -> bool {
    false
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_enabled() -> bool {
    true
}

fn default_page_size() -> u32 {
    10
}

fn default_channels() -> Vec<ChannelConfig> {
    let mut jobs = ChannelConfig::new(
        "jobs",
        ChannelKind::Jobs,
        "https://search.cm.ucf.edu/api/v1/jobs/",
    );
    jobs.min_query_len = Some(2);
    jobs.cache_capacity = 64;

    let mut events = ChannelConfig::new(
        "events",
        ChannelKind::Events,
        "https://events.ucf.edu/search/feed.json",
    );
    events.enabled = false;

    let mut quotes = ChannelConfig::new(
        "quotes",
        ChannelKind::Quotes,
        "https://search.cm.ucf.edu/api/v1/marketing/quotes/",
    );
    quotes.enabled = false;

    vec![
        ChannelConfig::new(
            "programs",
            ChannelKind::Programs,
            "https://search.cm.ucf.edu/api/v1/programs/search/",
        ),
        ChannelConfig::new(
            "news",
            ChannelKind::News,
            "https://www.ucf.edu/news/wp-json/wp/v2/posts/",
        ),
        ChannelConfig::new(
            "images",
            ChannelKind::Images,
            "https://search.cm.ucf.edu/api/v1/images/search/",
        ),
        jobs,
        events,
        quotes,
    ]
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_file()
    }

    /// Enabled channels, in declaration order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enabled)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for channel in &self.channels {
            if channel.name.trim().is_empty() {
                anyhow::bail!("channel with empty name (url {})", channel.url);
            }
            if !seen.insert(channel.name.as_str()) {
                anyhow::bail!("duplicate channel name {:?}", channel.name);
            }
            if channel.page_size == 0 {
                anyhow::bail!("channel {:?} has page_size = 0", channel.name);
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            http: HttpConfig::default(),
            channels: default_channels(),
        }
    }
}
