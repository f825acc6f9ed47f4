//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("irc.server is required")]
    MissingServer,
    #[error("irc.nick is required")]
    MissingNick,
    #[error("urls.ignore_pattern is not a valid regex: {0}")]
    InvalidIgnorePattern(String),
    #[error("urls.cache_capacity must be at least 1")]
    ZeroCacheCapacity,
    #[error("{section} lists {channel:?}, channel names start with '#'")]
    InvalidChannel { section: &'static str, channel: String },
    #[error("rss feed name {0:?} is used more than once")]
    DuplicateFeedName(String),
    #[error("lmgtfy.search_url is not a valid url: {0}")]
    InvalidSearchUrl(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.irc.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    }
    if config.irc.nick.trim().is_empty() {
        errors.push(ValidationError::MissingNick);
    }

    // Title cache
    if let Err(e) = Regex::new(&config.urls.ignore_pattern) {
        errors.push(ValidationError::InvalidIgnorePattern(e.to_string()));
    }
    if config.urls.cache_capacity == 0 {
        errors.push(ValidationError::ZeroCacheCapacity);
    }

    // Channel lists. irc.channels may omit the '#', Outbox::join adds it.
    let channel_lists: [(&'static str, &[String]); 2] = [
        ("greet.channels", &config.greet.channels),
        ("topic.channels", &config.topic.channels),
    ];
    for (section, channels) in channel_lists {
        for channel in channels {
            if !channel.starts_with('#') {
                errors.push(ValidationError::InvalidChannel {
                    section,
                    channel: channel.clone(),
                });
            }
        }
    }

    // Feeds
    let mut names = HashSet::new();
    for feed in &config.rss {
        if !feed.channel.starts_with('#') {
            errors.push(ValidationError::InvalidChannel {
                section: "rss.channel",
                channel: feed.channel.clone(),
            });
        }
        if !names.insert(feed.name.as_str()) {
            errors.push(ValidationError::DuplicateFeedName(feed.name.clone()));
        }
    }

    if config.lmgtfy.enabled
        && let Err(e) = reqwest::Url::parse(&config.lmgtfy.search_url)
    {
        errors.push(ValidationError::InvalidSearchUrl(e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r##"
[irc]
server = "irc.example.net:6667"
nick = "frank"
channels = ["#test"]
"##
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_nick_fails() {
        let toml = r#"
[irc]
server = "irc.example.net:6667"
nick = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingNick)));
    }

    #[test]
    fn test_collects_all_errors() {
        let toml = r##"
[irc]
server = ""

[urls]
cache_capacity = 0
ignore_pattern = "(unclosed"

[greet]
channels = ["chaos-hd"]

[lmgtfy]
search_url = "not a url"

[[rss]]
channel = "#a"
name = "dup"
url = "https://example.org/a.atom"

[[rss]]
channel = "#b"
name = "dup"
url = "https://example.org/b.atom"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();

        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingServer)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroCacheCapacity)));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidIgnorePattern(_)))
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidChannel { section: "greet.channels", .. }
        )));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::DuplicateFeedName(n) if n == "dup"))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidSearchUrl(_)))
        );
        assert_eq!(errors.len(), 6);
    }
}
