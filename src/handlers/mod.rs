//! Listeners for incoming IRC messages.
//!
//! Every listener implements [`Handler`] and is registered on the
//! [`Registry`]. The [`Dispatcher`] hands each message to all of them
//! concurrently; they decide for themselves whether it concerns them.

pub mod core;

mod admin;
mod greet;
mod help;
mod highlight;
mod invite;
mod karma;
mod lmgtfy;
mod manpages;
mod members;
mod raumbang;
mod rss;
mod topic;
mod urifind;

pub use self::core::{
    Correlation, DispatchReport, Dispatcher, Flow, Handler, HandlerResult, Listener,
    ListenerHandle, Registry,
};

pub use admin::{AdminCommand, AdminListener};
pub use greet::{Activity, GreetListener};
pub use help::HelpListener;
pub use highlight::{HighlightListener, HighlightRequest};
pub use invite::InviteListener;
pub use karma::{KarmaCommand, KarmaListener};
pub use lmgtfy::{GOOGLE_HOSTS, GOOGLE_SEARCH, LmgtfyListener, LuckySearch, lmgtfy_query, lucky_client};
pub use manpages::{DEBIAN_MANPAGES, ManpageListener, extract_manpages};
pub use members::MembersListener;
pub use raumbang::{PingProbe, RaumbangListener, RoomProbe};
pub use rss::{FeedEntry, FeedPoller, RecentLinks, parse_atom};
pub use topic::{MARKER, SEPARATOR, TopicChanger, format_event, insert_next_event};
pub use urifind::{UrlListener, extract_urls, format_age};
