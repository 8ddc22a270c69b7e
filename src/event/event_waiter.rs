//! # Event Waiter
//!
//! [`EventWaiter`] lets one consumer suspend until an event satisfying a
//! condition has been delivered, while any number of producers push events from
//! other threads.
//!
//! ## Protocol
//!
//! ```text
//! producer ──notify──▶ filter? ──no──▶ buffer ──condition?──yes──▶ +1 permit
//!                                        ▲                            │
//!                                        │ re-scan                    ▼
//! consumer ──wait_for──▶ scan ──miss──▶ acquire permit / timeout / cancel
//! ```
//!
//! The condition may read state that lives outside the events (for example the
//! ticket number the caller currently expects). A permit added at ingestion can
//! therefore be stale by the time the consumer waits, and an event that did not
//! match at ingestion can match later. The buffer is scanned before waiting and
//! again after waking, so a permit is only a hint to look again.
//!
//! ## Limitations
//!
//! One logical waiter at a time. Overlapping waits share the permits and may
//! consume each other's wake-ups.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use super::{
    event_bus::{EventError, EventReceiver},
    handler::EventHandler,
};
use crate::config::{WaiterConfig, duration_ms};

/// Predicate over a buffered event. Evaluated fresh on every call.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// # EventWaiter
///
/// Buffers every unfiltered event it is notified of and resolves
/// [`wait_for`](EventWaiter::wait_for) with the first buffered event satisfying
/// the condition.
///
/// Events are never removed, so repeated waits keep finding the same match
/// until the condition's external state changes.
///
/// Scans call the condition while holding the buffer's read lock, so it must not
/// call back into the waiter.
///
/// # Example
///
/// ```rust,no_run
/// # use event_waiter::EventWaiter;
/// # use std::sync::Arc;
/// # use std::sync::atomic::{AtomicU32, Ordering};
/// # use std::time::Duration;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ticket = Arc::new(AtomicU32::new(0));
/// let expected = ticket.clone();
/// let waiter = EventWaiter::new(move |e: &u32| *e == expected.load(Ordering::SeqCst));
///
/// waiter.notify(44);
/// waiter.notify(45);
/// ticket.store(45, Ordering::SeqCst);
///
/// let event = waiter.wait_for(Duration::from_millis(100), None).await?;
/// assert_eq!(event, 45);
/// # Ok(())
/// # }
/// ```
pub struct EventWaiter<T> {
    /// Append-only log of unfiltered events, in arrival order
    events: RwLock<Vec<T>>,
    /// Wake signal; one permit per event matching at ingestion
    signal: Semaphore,
    condition: Predicate<T>,
    filter: Predicate<T>,
    config: WaiterConfig,
}

/// How a suspended wait ended.
enum Wake {
    Signalled,
    TimedOut,
    Cancelled,
    Released,
}

impl<T> EventWaiter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a waiter that buffers every event.
    pub fn new<C>(condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::from_parts(Arc::new(condition), reject_nothing(), WaiterConfig::default())
    }

    /// Creates a waiter that discards events for which `filter` returns true.
    pub fn with_filter<C, F>(condition: C, filter: F) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::from_parts(Arc::new(condition), Arc::new(filter), WaiterConfig::default())
    }

    pub fn builder() -> EventWaiterBuilder<T> {
        EventWaiterBuilder::new()
    }

    fn from_parts(condition: Predicate<T>, filter: Predicate<T>, config: WaiterConfig) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            signal: Semaphore::new(0),
            condition,
            filter,
            config,
        }
    }

    /// Ingests an event. Never blocks on a waiter; safe from any thread.
    pub fn notify(&self, event: T) {
        if (self.filter)(&event) {
            trace!("Event filtered");
            return;
        }

        // evaluated before the push; only the permit has to come after it
        let matched = (self.condition)(&event);
        let buffered = {
            let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
            events.push(event);
            events.len()
        };
        trace!(buffered, matched, "Event buffered");

        // the permit must follow the push, or a woken waiter could miss the event
        if matched && !self.signal.is_closed() {
            self.signal.add_permits(1);
            debug!("Wake signal raised");
        }
    }

    /// Waits until a buffered event satisfies the condition.
    ///
    /// The buffer is scanned first and a current match is returned without
    /// suspending. Otherwise the call suspends until a wake signal arrives,
    /// `timeout` elapses or `cancel` is triggered, and then scans again.
    ///
    /// # Errors
    ///
    /// * `WaitError::Timeout` - nothing matched before or after the deadline
    /// * `WaitError::Cancelled` - the token was cancelled while waiting
    /// * `WaitError::NoMatch` - woken, but no buffered event matches any more
    /// * `WaitError::Released` - the waiter was released
    #[instrument(skip(self, cancel))]
    pub async fn wait_for(
        &self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> WaitResult<T> {
        if self.signal.is_closed() {
            return Err(WaitError::Released);
        }

        if let Some(event) = self.find_match() {
            debug!("Matching event already buffered");
            return Ok(event);
        }

        let wake = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Wake::Cancelled,
                    wake = self.acquire(timeout) => wake,
                }
            }
            None => self.acquire(timeout).await,
        };

        let result = match wake {
            Wake::Signalled => self.find_match().ok_or(WaitError::NoMatch),
            Wake::TimedOut => self.find_match().ok_or(WaitError::Timeout {
                timeout_ms: duration_ms::saturating_millis(timeout),
            }),
            Wake::Cancelled => Err(WaitError::Cancelled),
            Wake::Released => Err(WaitError::Released),
        };
        match &result {
            Ok(_) => debug!("Wait resolved with a matching event"),
            Err(e) => debug!("Wait failed: {}", e),
        }
        result
    }

    /// [`wait_for`](Self::wait_for) with the configured default timeout and no cancellation.
    pub async fn wait(&self) -> WaitResult<T> {
        self.wait_for(self.config.default_timeout, None).await
    }

    async fn acquire(&self, timeout: Duration) -> Wake {
        match tokio::time::timeout(timeout, self.signal.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                Wake::Signalled
            }
            Ok(Err(_)) => Wake::Released,
            Err(_) => Wake::TimedOut,
        }
    }

    fn find_match(&self) -> Option<T> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|&event| (self.condition)(event))
            .cloned()
    }

    /// Closes the wake signal. Suspended and later waits fail with `WaitError::Released`.
    pub fn release(&self) {
        debug!("Releasing event waiter");
        self.signal.close();
    }

    pub fn is_released(&self) -> bool {
        self.signal.is_closed()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffered events in arrival order.
    pub fn snapshot(&self) -> Vec<T> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wake signals raised but not yet consumed by a waiter.
    pub fn pending_signals(&self) -> usize {
        self.signal.available_permits()
    }

    pub fn config(&self) -> &WaiterConfig {
        &self.config
    }

    /// Forwards every event received from an [`EventBus`](super::event_bus::EventBus)
    /// subscription into [`notify`](Self::notify) until the bus is dropped.
    ///
    /// After a lag the listener logs the skipped count and resumes from the
    /// oldest event the bus still holds.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn listen(self: &Arc<Self>, mut receiver: EventReceiver<T>) -> JoinHandle<()> {
        let waiter = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => waiter.notify(event),
                    Err(EventError::Lagged { count }) => {
                        warn!("Event waiter lagged behind the bus, {} events lost", count);
                    }
                    Err(e) => {
                        debug!("Event waiter stopped listening: {}", e);
                        break;
                    }
                }
            }
        })
    }
}

impl<S, T> EventHandler<S, T> for EventWaiter<T>
where
    S: ?Sized,
    T: Clone + Send + Sync + 'static,
{
    fn on_event(&self, _sender: &S, event: T) {
        self.notify(event)
    }
}

impl<T> fmt::Debug for EventWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWaiter")
            .field(
                "buffered",
                &self
                    .events
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len(),
            )
            .field("pending_signals", &self.signal.available_permits())
            .field("released", &self.signal.is_closed())
            .field("config", &self.config)
            .finish()
    }
}

fn reject_nothing<T: 'static>() -> Predicate<T> {
    Arc::new(|_: &T| false)
}

pub struct EventWaiterBuilder<T> {
    condition: Option<Predicate<T>>,
    filter: Option<Predicate<T>>,
    config: WaiterConfig,
}

impl<T> EventWaiterBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            condition: None,
            filter: None,
            config: WaiterConfig::default(),
        }
    }

    pub fn condition<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn config(mut self, config: WaiterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<EventWaiter<T>, WaiterBuilderError> {
        let condition = self.condition.ok_or(WaiterBuilderError::ConditionRequired)?;
        let filter = self.filter.unwrap_or_else(reject_nothing);
        Ok(EventWaiter::from_parts(condition, filter, self.config))
    }
}

impl<T> Default for EventWaiterBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("No matching event within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Wait cancelled")]
    Cancelled,

    #[error("Woken but no buffered event matches the condition")]
    NoMatch,

    #[error("Event waiter already released")]
    Released,
}

impl WaitError {
    /// Whether waiting again on the same waiter can still succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WaitError::Timeout { .. } | WaitError::NoMatch)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaiterBuilderError {
    #[error("condition is required")]
    ConditionRequired,
}

pub type WaitResult<T> = Result<T, WaitError>;
