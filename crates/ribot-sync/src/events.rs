//! # Event Bus
//!
//! Fire-and-forget delivery of [`BusEvent`]s to whoever is listening.
//!
//! ```text
//! ┌──────────────┐   post()    ┌────────────────────────┐
//! │ DataManager  │────────────►│ broadcast::Sender      │
//! │ HTTP client  │             │ (capacity 16)          │
//! └──────────────┘             └───────────┬────────────┘
//!                                          │ clone per subscriber
//!                      ┌───────────────────┼───────────────────┐
//!                      ▼                   ▼                   ▼
//!               EventSubscription   EventSubscription   EventSubscription
//!               (drop = unregister)
//! ```
//!
//! Publishing never fails from the caller's point of view: with no
//! subscribers the event is simply dropped.

use ribot_core::BusEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 16;

/// Broadcast channel for [`BusEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    /// Publishes `event` to every current subscriber.
    ///
    /// ## Returns
    /// Number of subscribers the event was queued for (0 if none).
    pub fn post(&self, event: BusEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(%event, receivers, "Event posted");
                receivers
            }
            Err(_) => {
                debug!(%event, "Event posted with no subscribers");
                0
            }
        }
    }

    /// Registers a new subscriber. It sees events posted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A registered listener on an [`EventBus`]. Dropping it unregisters.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<BusEvent>,
}

impl EventSubscription {
    /// Waits for the next event.
    ///
    /// ## Returns
    /// * `Some(event)` - Next event in publish order
    /// * `None` - Every [`EventBus`] handle was dropped
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, oldest events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, oldest events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
