//! Core configuration types.

use super::defaults::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Connection and identity.
    pub irc: IrcConfig,
    /// Listener dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Link title lookups.
    #[serde(default)]
    pub urls: UrlsConfig,
    /// Karma store.
    #[serde(default)]
    pub karma: KarmaConfig,
    /// Greeting of new channel members.
    #[serde(default)]
    pub greet: GreetConfig,
    /// Highlight test replies.
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// `lmgtfy` answers.
    #[serde(default)]
    pub lmgtfy: LmgtfyConfig,
    /// `!raum` room status. Disabled when absent.
    pub raumbang: Option<RaumbangConfig>,
    /// Topic upkeep.
    #[serde(default)]
    pub topic: TopicConfig,
    /// Atom feeds announced into channels.
    #[serde(default)]
    pub rss: Vec<FeedConfig>,
    /// Polling schedule shared by all feeds.
    #[serde(default)]
    pub rss_settings: RssSettings,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Connection and identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server address (e.g., "irc.twice-irc.de:6667").
    pub server: String,
    /// Nickname to register with.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Realname sent with USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Password for nickserv identification.
    pub nickserv_password: Option<String>,
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Nicks allowed to run admin commands.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Nicks whose messages are dropped before dispatch.
    #[serde(default = "default_ignored_nicks")]
    pub ignored_nicks: Vec<String>,
}

/// Listener dispatch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Seconds after which a still-running listener is reported as timed out.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: default_handler_timeout_secs(),
        }
    }
}

impl DispatchConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

/// Link title configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlsConfig {
    /// Number of (url, title) pairs remembered.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Hours a cached title stays valid.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    /// A title already posted within this many seconds is not repeated.
    #[serde(default = "default_no_repost_secs")]
    pub no_repost_secs: u64,
    /// Per-fetch timeout.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Titles longer than this are cut.
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
    /// URLs matching this regex are never fetched.
    #[serde(default = "default_ignore_pattern")]
    pub ignore_pattern: String,
    /// Titles not worth posting.
    #[serde(default = "default_pointless_titles")]
    pub pointless_titles: Vec<String>,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_hours: default_cache_ttl_hours(),
            no_repost_secs: default_no_repost_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_title_len: default_max_title_len(),
            ignore_pattern: default_ignore_pattern(),
            pointless_titles: default_pointless_titles(),
        }
    }
}

impl UrlsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    pub fn no_repost(&self) -> Duration {
        Duration::from_secs(self.no_repost_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Karma store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KarmaConfig {
    #[serde(default = "default_karma_path")]
    pub path: PathBuf,
}

impl Default for KarmaConfig {
    fn default() -> Self {
        Self {
            path: default_karma_path(),
        }
    }
}

/// Greeting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GreetConfig {
    /// Channels where newcomers are greeted.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Last-seen store location.
    #[serde(default = "default_last_seen_path")]
    pub path: PathBuf,
    /// Someone absent for longer than this counts as new.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Minimum seconds between two writes of the last-seen store.
    #[serde(default = "default_write_interval_secs")]
    pub write_interval_secs: u64,
    /// Greeting text; `{nick}` and `{bot}` are replaced.
    #[serde(default = "default_greeting_template")]
    pub template: String,
}

impl Default for GreetConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            path: default_last_seen_path(),
            retention_days: default_retention_days(),
            write_interval_secs: default_write_interval_secs(),
            template: default_greeting_template(),
        }
    }
}

impl GreetConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 3600)
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_secs(self.write_interval_secs)
    }
}

/// Highlight test configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_highlight_delay_ms")]
    pub delay_ms: u64,
    /// Channel `highpub` posts to.
    #[serde(default = "default_highlight_channel")]
    pub public_channel: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_highlight_delay_ms(),
            public_channel: default_highlight_channel(),
        }
    }
}

/// lmgtfy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LmgtfyConfig {
    #[serde(default = "default_lmgtfy_enabled")]
    pub enabled: bool,
    /// Search endpoint taking `btnI` and `q`.
    #[serde(default = "default_lmgtfy_search_url")]
    pub search_url: String,
    /// Redirects are followed while the host contains this.
    #[serde(default = "default_lmgtfy_stay_on")]
    pub stay_on: String,
}

impl Default for LmgtfyConfig {
    fn default() -> Self {
        Self {
            enabled: default_lmgtfy_enabled(),
            search_url: default_lmgtfy_search_url(),
            stay_on: default_lmgtfy_stay_on(),
        }
    }
}

/// `!raum` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RaumbangConfig {
    /// Host that answers pings while the room is open.
    pub host: String,
    #[serde(default = "default_raum_cooldown_secs")]
    pub cooldown_secs: u64,
}

/// Topic changer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    /// Channels whose topic carries the next event.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_topic_interval_secs")]
    pub interval_secs: u64,
    /// SQLite database with the event table. The changer is off without it.
    pub database: Option<String>,
    #[serde(default = "default_topic_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            interval_secs: default_topic_interval_secs(),
            database: None,
            fetch_timeout_secs: default_topic_fetch_timeout_secs(),
        }
    }
}

/// One Atom feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub channel: String,
    /// Short name shown as `::name::`.
    pub name: String,
    pub url: String,
}

/// Feed polling schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct RssSettings {
    #[serde(default = "default_rss_check_every_secs")]
    pub check_every_secs: u64,
    /// Entries older than this are not announced.
    #[serde(default = "default_rss_freshness_mins")]
    pub freshness_mins: u64,
    #[serde(default = "default_rss_retry_after_secs")]
    pub retry_after_secs: u64,
    #[serde(default = "default_rss_max_items")]
    pub max_items: usize,
}

impl Default for RssSettings {
    fn default() -> Self {
        Self {
            check_every_secs: default_rss_check_every_secs(),
            freshness_mins: default_rss_freshness_mins(),
            retry_after_secs: default_rss_retry_after_secs(),
            max_items: default_rss_max_items(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[irc]
server = "irc.example.net:6667"
"#,
        )
        .unwrap();

        assert_eq!(config.irc.nick, "frank");
        assert_eq!(config.irc.ignored_nicks, vec!["eicar", "i3"]);
        assert_eq!(config.dispatch.handler_timeout(), Duration::from_secs(30));
        assert_eq!(config.urls.cache_capacity, 500);
        assert_eq!(config.urls.cache_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.greet.template, "Hey {nick}! o/");
        assert_eq!(config.highlight.public_channel, "#test");
        assert!(config.lmgtfy.enabled);
        assert_eq!(config.lmgtfy.search_url, "https://www.google.com/search");
        assert!(config.raumbang.is_none());
        assert!(config.topic.database.is_none());
        assert!(config.rss.is_empty());
        assert_eq!(config.rss_settings.max_items, 3);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_feeds_parse_as_array_of_tables() {
        let config: Config = toml::from_str(
            r##"
[irc]
server = "irc.example.net:6667"

[[rss]]
channel = "#chaos-hd"
name = "frank"
url = "https://github.com/breunigs/frank/commits/master.atom"

[[rss]]
channel = "#i3"
name = "i3"
url = "https://github.com/i3/i3/commits/next.atom"
"##,
        )
        .unwrap();

        assert_eq!(config.rss.len(), 2);
        assert_eq!(config.rss[1].name, "i3");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../../frank.toml")).unwrap();
        assert!(crate::config::validate(&config).is_ok());
        assert_eq!(config.raumbang.as_ref().map(|r| r.cooldown_secs), Some(5));
        assert_eq!(config.rss.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/frank.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
