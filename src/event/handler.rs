//! Subscriber-shaped callbacks.
//!
//! [`EventHandler`] is the conventional `(sender, event)` callback shape used by
//! synchronous publishers. Anything implementing it can be subscribed to an
//! [`EventPublisher`] directly, without adapter closures.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

pub trait EventHandler<S: ?Sized, T>: Send + Sync {
    fn on_event(&self, sender: &S, event: T);
}

impl<S: ?Sized, T, H: EventHandler<S, T> + ?Sized> EventHandler<S, T> for Arc<H> {
    fn on_event(&self, sender: &S, event: T) {
        (**self).on_event(sender, event)
    }
}

pub type SharedHandler<T> = Arc<dyn EventHandler<EventPublisher<T>, T>>;

/// Synchronous publisher invoking every subscribed handler on the calling thread.
pub struct EventPublisher<T> {
    handlers: RwLock<Vec<SharedHandler<T>>>,
}

impl<T: Clone> EventPublisher<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: SharedHandler<T>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Delivers `event` to each handler in subscription order, with `self` as sender.
    pub fn publish(&self, event: T) {
        // snapshot so handlers may subscribe while being invoked
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        trace!("Publishing to {} handlers", handlers.len());
        for handler in handlers {
            handler.on_event(self, event.clone());
        }
    }

    pub fn subscribers_size(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Clone> Default for EventPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}
