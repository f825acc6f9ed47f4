//! frank - an IRC bot.
//!
//! Inbound messages are handed to every registered listener concurrently.
//! Listeners cover karma, link titles, greetings, topic upkeep, feed
//! announcements and a handful of small private commands.

pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod network;
pub mod state;
pub mod telemetry;

pub use bot::{Bot, Services};
