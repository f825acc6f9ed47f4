//! Listener registry.
//!
//! The registry owns the set of listeners. Callers only get a
//! [`ListenerHandle`], which can remove exactly the registration it came from.

use super::traits::Handler;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A registered listener.
pub struct Listener {
    id: u64,
    description: String,
    created_at: DateTime<Utc>,
    handler: Arc<dyn Handler>,
}

impl Listener {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Handle that removes this listener.
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle { id: self.id }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Capability to remove one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: u64,
}

/// The set of listeners every inbound message is dispatched to.
pub struct Registry {
    listeners: RwLock<Vec<Arc<Listener>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler`. Subsequent dispatches include it.
    pub fn add(&self, description: impl Into<String>, handler: Arc<dyn Handler>) -> ListenerHandle {
        let listener = Arc::new(Listener {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
            created_at: Utc::now(),
            handler,
        });
        let handle = listener.handle();
        debug!(listener = %listener.description, "Adding listener");
        self.listeners.write().push(listener);
        handle
    }

    /// Remove the registration behind `handle`.
    ///
    /// Idempotent: returns `false` if it was already gone.
    pub fn remove(&self, handle: &ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| l.id == handle.id) {
            Some(pos) => {
                let removed = listeners.remove(pos);
                debug!(listener = %removed.description, "Removed listener");
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of all listeners, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Listener>> {
        self.listeners.read().clone()
    }

    /// Drop every listener.
    pub fn reset(&self) {
        let mut listeners = self.listeners.write();
        debug!(count = listeners.len(), "Resetting listeners");
        listeners.clear();
    }

    pub fn contains(&self, handle: &ListenerHandle) -> bool {
        self.listeners.read().iter().any(|l| l.id == handle.id)
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptions of all listeners, for diagnostics.
    pub fn descriptions(&self) -> Vec<String> {
        self.listeners
            .read()
            .iter()
            .map(|l| l.description.clone())
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
