//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions, one per TOML section
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup checks collecting every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{
    Config, ConfigError, DispatchConfig, FeedConfig, GreetConfig, HighlightConfig, IrcConfig,
    KarmaConfig, LmgtfyConfig, LoggingConfig, RaumbangConfig, RssSettings, TopicConfig, UrlsConfig,
};
pub use validation::{ValidationError, validate};
