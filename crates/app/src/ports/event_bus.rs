//! Event bus port — publish committed inventory changes.

use std::future::Future;

use orchestrator_domain::error::InventoryError;
use orchestrator_domain::event::Event;

/// Publishes committed events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), InventoryError>> + Send {
        (**self).publish(event)
    }
}
