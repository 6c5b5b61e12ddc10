//! Notification tokens
//!
//! `PersistedMap::observe` returns a `NotificationToken`. Keeping the token
//! keeps the handler registered; dropping it (or calling `unregister`)
//! removes the handler. The token does not keep the store alive, and
//! unregistering after the store was closed or dropped is a no-op.

use dualstore_storage::{DictionaryChange, SubscriptionHandle};

/// Keys changed in a managed map by one committed write transaction
pub type MapChange = DictionaryChange;

/// Keeps a map change handler registered
#[derive(Debug)]
#[must_use = "the handler is unregistered as soon as the token is dropped"]
pub struct NotificationToken {
    handle: SubscriptionHandle,
}

impl NotificationToken {
    pub(crate) fn new(handle: SubscriptionHandle) -> Self {
        NotificationToken { handle }
    }

    /// Stop deliveries. Calling it again does nothing.
    pub fn unregister(&mut self) {
        self.handle.unregister();
    }

    /// Whether the handler is still registered
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }
}
