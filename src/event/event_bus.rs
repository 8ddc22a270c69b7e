//! # Event Bus Implementation
//!
//! The EventBus is a broadcast-based publish-subscribe hub. Any number of
//! producers publish events of a single payload type `T`; every subscriber
//! receives its own copy.
//!
//! ## Design Decisions
//!
//! The implementation uses Tokio's broadcast channel rather than MPSC channels to:
//!
//! 1. Allow multiple subscribers to receive the same event
//! 2. Bound memory through the channel capacity
//! 3. Support non-blocking publish operations from synchronous code
//!
//! A slow subscriber does not block publishers. Instead it lags, and its
//! [`EventReceiver`] reports how many events were skipped.

use std::fmt::Debug;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::WaiterConfig;

/// # EventBus
///
/// Central message hub distributing events of type `T` to multiple receivers.
///
/// ## Capacity and Backpressure
///
/// If a receiver falls more than `capacity` events behind, the oldest events are
/// dropped for that receiver and it observes [`EventError::Lagged`].
pub struct EventBus<T> {
    /// Broadcast sender for events
    event_sender: broadcast::Sender<T>,
    /// Maximum number of events that can be buffered
    capacity: usize,
    /// Internal receiver to keep the broadcast channel active
    _internal_receiver: broadcast::Receiver<T>,
}

impl<T: Clone + Debug> EventBus<T> {
    /// Creates a new EventBus with the specified buffer capacity.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use event_waiter::EventBus;
    /// let event_bus: EventBus<u64> = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (event_sender, event_receiver) = broadcast::channel(capacity);
        Self {
            event_sender,
            capacity,
            _internal_receiver: event_receiver,
        }
    }

    pub fn from_config(config: &WaiterConfig) -> Self {
        Self::new(config.event_buffer_size)
    }

    /// Subscribes to events published after this call.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use event_waiter::EventBus;
    /// # fn example() {
    /// let event_bus: EventBus<String> = EventBus::new(100);
    /// let mut event_rx = event_bus.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = event_rx.recv().await {
    ///         println!("received {}", event);
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> EventReceiver<T> {
        EventReceiver::new(self.event_sender.subscribe())
    }

    /// Publishes an event to all subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SendFailed`] if the event could not be sent.
    pub async fn publish(&self, event: T) -> EventResult<()> {
        self.sync_publish(event)
    }

    /// Publishes an event synchronously without awaiting.
    ///
    /// Same behavior as [`EventBus::publish`], usable from plain threads.
    pub fn sync_publish(&self, event: T) -> EventResult<()> {
        debug!("Publishing Event: {:?}", event);
        self.event_sender
            .send(event)
            .map_err(|e| EventError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }

    pub fn queue_size(&self) -> usize {
        self.event_sender.len()
    }

    /// Number of receivers, including the internal one.
    pub fn subscribers_size(&self) -> usize {
        self.event_sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

pub struct EventReceiver<T> {
    pub receiver: broadcast::Receiver<T>,
}

impl<T: Clone> EventReceiver<T> {
    pub fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// イベントを受信する。Laggedエラーの場合は取りこぼした件数を返す。
    /// 受信位置はチャネルに残っている最古のイベントへ進んでいるので、次のrecvでそこから受信を続けられる。
    pub async fn recv(&mut self) -> EventResult<T> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(EventError::Lagged { count: n }),
            Err(e) => Err(EventError::ReceiveFailed {
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event Send failed: {message}")]
    SendFailed { message: String },

    #[error("Event Receive failed: {message}")]
    ReceiveFailed { message: String },

    #[error("Event lagged: {count}")]
    Lagged { count: u64 },
}

pub type EventResult<T> = Result<T, EventError>;
