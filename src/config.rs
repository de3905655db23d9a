//! Configuration module for feedbot.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{FeedbotError, Result};

/// Feed source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the RSS/Atom feed.
    #[serde(default)]
    pub url: String,
    /// Polling interval in seconds.
    #[serde(default = "default_feed_interval")]
    pub interval_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size: u64,
}

fn default_feed_interval() -> u64 {
    300
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024
}

impl FeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval_secs: default_feed_interval(),
            max_feed_size: default_max_feed_size(),
        }
    }
}

/// Telegram delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token.
    #[serde(default)]
    pub token: String,
    /// Destination channel, `@name` or numeric ID.
    #[serde(default)]
    pub channel: String,
    /// Bot API base URL.
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            api_url: default_telegram_api_url(),
        }
    }
}

/// Dedup store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "data/feedbot.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Outbound HTTP configuration shared by all components.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Proxy URL. Falls back to `HTTP_PROXY` when unset.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Maximum number of retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial wait between retries in milliseconds.
    #[serde(default = "default_retry_min_wait")]
    pub retry_min_wait_ms: u64,
    /// Upper bound of the wait between retries in milliseconds.
    #[serde(default = "default_retry_max_wait")]
    pub retry_max_wait_ms: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_min_wait() -> u64 {
    1000
}

fn default_retry_max_wait() -> u64 {
    30_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            max_redirects: default_max_redirects(),
            proxy: None,
            max_retries: default_max_retries(),
            retry_min_wait_ms: default_retry_min_wait(),
            retry_max_wait_ms: default_retry_max_wait(),
        }
    }
}

/// Local copy of delivered article pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarbonCopyConfig {
    /// Directory receiving the pages. Disabled when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Feed source.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Telegram delivery.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Dedup store.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Outbound HTTP.
    #[serde(default)]
    pub http: HttpConfig,
    /// Local page copies.
    #[serde(default)]
    pub carbon_copy: CarbonCopyConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedbotError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedbotError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TELEGRAM_TOKEN`: bot token
    /// - `TELEGRAM_CHANNEL`: destination channel
    /// - `RSS_FEED`: feed URL
    /// - `RSS_FEED_PERIOD`: polling interval (`300`, `90s`, `5m`, `1h`)
    /// - `STORE_PATH`: dedup store path
    /// - `CARBON_COPY_DIR`: carbon copy directory
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(token) = env_value("TELEGRAM_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(channel) = env_value("TELEGRAM_CHANNEL") {
            self.telegram.channel = channel;
        }
        if let Some(url) = env_value("RSS_FEED") {
            self.feed.url = url;
        }
        if let Some(period) = env_value("RSS_FEED_PERIOD") {
            self.feed.interval_secs = parse_period(&period)?.as_secs();
        }
        if let Some(path) = env_value("STORE_PATH") {
            self.storage.path = path;
        }
        if let Some(dir) = env_value("CARBON_COPY_DIR") {
            self.carbon_copy.dir = Some(dir);
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the feed URL, bot token or channel is missing,
    /// or the polling interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.feed.url.is_empty() {
            return Err(FeedbotError::Validation(
                "feed url is not set. Set it in config.toml or via RSS_FEED environment variable."
                    .to_string(),
            ));
        }
        if self.telegram.token.is_empty() {
            return Err(FeedbotError::Validation(
                "telegram token is not set. \
                 Set it in config.toml or via TELEGRAM_TOKEN environment variable."
                    .to_string(),
            ));
        }
        if self.telegram.channel.is_empty() {
            return Err(FeedbotError::Validation(
                "telegram channel is not set. \
                 Set it in config.toml or via TELEGRAM_CHANNEL environment variable."
                    .to_string(),
            ));
        }
        if self.feed.interval_secs == 0 {
            return Err(FeedbotError::Validation(
                "feed interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Parse a period such as `300`, `90s`, `5m`, `1h` or `1h30m`.
///
/// A bare number counts seconds. Otherwise the value is a sequence of
/// `<number><unit>` segments with units `h`, `m` and `s`.
pub fn parse_period(value: &str) -> Result<Duration> {
    let value = value.trim();
    let invalid = || FeedbotError::Config(format!("invalid period: {value:?}"));

    if value.is_empty() {
        return Err(invalid());
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = value.parse().map_err(|_| invalid())?;
        return Ok(Duration::from_secs(secs));
    }

    let mut rest = value;
    let mut total: u64 = 0;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let number: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        let scale = match rest[digits..].chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 3600,
            _ => return Err(invalid()),
        };
        total = number
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| FeedbotError::Config(format!("period out of range: {value:?}")))?;
        rest = &rest[digits + 1..];
    }

    Ok(Duration::from_secs(total))
}
