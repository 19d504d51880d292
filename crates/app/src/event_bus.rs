//! Fan-out of committed inventory changes to in-process listeners.
//!
//! The daemon's event log is one such listener. A listener that falls more
//! than `capacity` changes behind loses the oldest ones and is told how many
//! it missed.

use std::future::Future;

use tokio::sync::broadcast;

use orchestrator_domain::error::InventoryError;
use orchestrator_domain::event::Event;

use crate::ports::EventPublisher;

/// [`EventPublisher`] over a [`broadcast`] channel of inventory [`Event`]s.
///
/// A change committed while nobody listens is not kept.
#[derive(Debug)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Bus buffering at most `capacity` unread changes per listener.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Listen to the changes committed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), InventoryError>> + Send {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event_id = %event.id, "no listener for inventory change");
        }
        async { Ok(()) }
    }
}
