//! Shared bot state.
//!
//! Everything here is owned by the bot and shared with listeners through
//! `Arc`. Stores that outlive a restart go through [`persistence`].

mod identity;
mod karma;
mod last_seen;
mod members;
pub mod persistence;
mod title_cache;

pub use identity::Identity;
pub use karma::KarmaStore;
pub use last_seen::LastSeenStore;
pub use members::{MembershipEvent, MembershipTracker};
pub use title_cache::{CachedTitle, TitleCache};
