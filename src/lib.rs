//! # event-waiter
//!
//! A synchronization primitive for waiting on events produced elsewhere.
//!
//! An [`EventWaiter`] is notified of events by any number of producer threads and
//! lets one consumer wait, with a timeout and optional cancellation, until an
//! event satisfying a condition is available. The condition may depend on state
//! outside the events and is re-evaluated against every buffered event whenever
//! a match is sought.
//!
//! - Waiting primitive ([`event::event_waiter`])
//! - Subscriber adapters ([`event::handler`], [`event::event_bus`])
//! - Configuration ([`config`])
//! - Error handling ([`error`])

pub mod config;
pub mod error;
pub mod event;

// Re-exports
pub use config::WaiterConfig;
pub use error::*;
pub use event::event_bus::{EventBus, EventError, EventReceiver, EventResult};
pub use event::event_waiter::{
    EventWaiter, EventWaiterBuilder, Predicate, WaitError, WaitResult, WaiterBuilderError,
};
pub use event::handler::{EventHandler, EventPublisher, SharedHandler};
pub use tokio_util::sync::CancellationToken;
