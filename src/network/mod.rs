//! Network module.
//!
//! Contains the server [`Connection`], its line codec and the outbound
//! [`Outbox`].

pub mod codec;
mod connection;
mod outbox;

pub use connection::Connection;
pub use outbox::Outbox;
