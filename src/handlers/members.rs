//! Feeds the membership tracker from the message stream.

use super::core::{Flow, Handler, HandlerResult};
use crate::state::MembershipTracker;
use async_trait::async_trait;
use frank_proto::Message;
use std::sync::Arc;
use tracing::warn;

pub struct MembersListener {
    tracker: Arc<MembershipTracker>,
}

impl MembersListener {
    pub fn new(tracker: Arc<MembershipTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Handler for MembersListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        // Malformed membership events are dropped, they are not a listener failure.
        if let Err(e) = self.tracker.handle_message(msg) {
            warn!(code = e.error_code(), error = %e, message = %msg, "Ignoring membership event");
        }
        Ok(Flow::Continue)
    }
}
