//! # Event Waiting
//!
//! Components for delivering events to a consumer that waits for a specific one.
//!
//! - **EventWaiter**: buffers incoming events and resolves a wait with the first
//!   event matching a condition that may change over time
//! - **EventHandler / EventPublisher**: the `(sender, event)` subscriber shape and
//!   a synchronous publisher invoking it
//! - **EventBus**: a broadcast hub whose subscriptions an EventWaiter can listen to
//!
//! ## Event Flow
//!
//! ```text
//! ┌──────────┐     ┌──────────────┐  notify   ┌─────────────┐  wait_for  ┌────────┐
//! │Publisher │────▶│ EventBus /   │──────────▶│ EventWaiter │◀───────────│Consumer│
//! └──────────┘     │EventPublisher│           └─────────────┘            └────────┘
//!                  └──────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! # use event_waiter::{EventBus, EventWaiter};
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: EventBus<String> = EventBus::new(16);
//! let waiter = Arc::new(EventWaiter::new(|e: &String| e.starts_with("ready")));
//! let _listener = waiter.listen(bus.subscribe());
//!
//! bus.publish("ready: worker-1".to_string()).await?;
//!
//! let event = waiter.wait_for(Duration::from_secs(1), None).await?;
//! println!("{}", event);
//! waiter.release();
//! # Ok(())
//! # }
//! ```

pub mod event_bus;
pub mod event_waiter;
pub mod handler;
