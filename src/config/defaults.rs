//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::path::PathBuf;

// =============================================================================
// IRC Defaults
// =============================================================================

pub fn default_nick() -> String {
    "frank".to_string()
}

pub fn default_realname() -> String {
    "frank".to_string()
}

pub fn default_ignored_nicks() -> Vec<String> {
    vec!["eicar".to_string(), "i3".to_string()]
}

// =============================================================================
// Dispatch Defaults
// =============================================================================

pub fn default_handler_timeout_secs() -> u64 {
    30
}

// =============================================================================
// URL / Title Cache Defaults
// =============================================================================

pub fn default_cache_capacity() -> usize {
    500
}

pub fn default_cache_ttl_hours() -> u64 {
    24
}

pub fn default_no_repost_secs() -> u64 {
    30
}

pub fn default_fetch_timeout_secs() -> u64 {
    10
}

pub fn default_max_title_len() -> usize {
    500
}

pub fn default_ignore_pattern() -> String {
    r"^http://p\.nnev\.de".to_string()
}

pub fn default_pointless_titles() -> Vec<String> {
    [
        "",
        "imgur: the simple image sharer",
        "Fefes Blog",
        "Gmane Loom",
        "i3 - A better tiling and dynamic window manager",
        "i3 - improved tiling wm",
        "IT-News, c't, iX, Technology Review, Telepolis | heise online",
        "debian Pastezone",
        "Index of /docs/",
        "NoName e.V. pastebin",
        "Nopaste - powered by project-mindstorm IT Services",
        "Diff NoName e.V. pastebin",
        "pr0gramm.com",
        "Google",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// =============================================================================
// Persistence Defaults
// =============================================================================

pub fn default_karma_path() -> PathBuf {
    PathBuf::from("karma.json")
}

pub fn default_last_seen_path() -> PathBuf {
    PathBuf::from("last-seen.json")
}

pub fn default_retention_days() -> u64 {
    30
}

pub fn default_write_interval_secs() -> u64 {
    60
}

pub fn default_greeting_template() -> String {
    "Hey {nick}! o/".to_string()
}

// =============================================================================
// Feature Defaults
// =============================================================================

pub fn default_highlight_delay_ms() -> u64 {
    4900
}

pub fn default_highlight_channel() -> String {
    "#test".to_string()
}

pub fn default_raum_cooldown_secs() -> u64 {
    5
}

pub fn default_lmgtfy_enabled() -> bool {
    true
}

pub fn default_lmgtfy_search_url() -> String {
    crate::handlers::GOOGLE_SEARCH.to_string()
}

pub fn default_lmgtfy_stay_on() -> String {
    crate::handlers::GOOGLE_HOSTS.to_string()
}

pub fn default_topic_interval_secs() -> u64 {
    300
}

pub fn default_topic_fetch_timeout_secs() -> u64 {
    60
}

pub fn default_rss_check_every_secs() -> u64 {
    180
}

pub fn default_rss_freshness_mins() -> u64 {
    90
}

pub fn default_rss_retry_after_secs() -> u64 {
    540
}

pub fn default_rss_max_items() -> usize {
    3
}

pub fn default_log_format() -> String {
    "text".to_string()
}
