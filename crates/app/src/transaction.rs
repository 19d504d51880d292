//! Runs logical mutations as units of work.
//!
//! [`Transactor::run`] begins a unit, runs the operation, settles the
//! reactions, commits, and then publishes the committed changes. A unit that
//! fails with a retryable conflict is rolled back and run again from scratch,
//! up to [`RetryPolicy::max_attempts`] times.
//!
//! An operation is a closure returning a [`UnitFuture`]. The future borrows
//! only the unit and the change list, so it owns whatever else it needs:
//!
//! ```ignore
//! tx.run(|unit, changes| {
//!     let device = device.clone();
//!     boxed(async move {
//!         unit.insert_device(&device).await?;
//!         changes.push(Change::DeviceCreated { device: device.id });
//!         Ok(device)
//!     })
//! })
//! ```

use std::future::Future;
use std::pin::Pin;

use orchestrator_domain::error::InventoryError;
use orchestrator_domain::event::Event;

use crate::ports::{EventPublisher, InventoryStore, UnitOfWork};
use crate::reactions::{Changes, settle};

/// One attempt of an operation run by [`Transactor::run`].
pub type UnitFuture<'u, T> = Pin<Box<dyn Future<Output = Result<T, InventoryError>> + Send + 'u>>;

/// Box the body of an operation.
pub fn boxed<'u, T, F>(fut: F) -> UnitFuture<'u, T>
where
    F: Future<Output = Result<T, InventoryError>> + Send + 'u,
{
    Box::pin(fut)
}

/// Bound on how often a conflicting unit of work is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Executes operations atomically against an [`InventoryStore`].
#[derive(Debug, Clone)]
pub struct Transactor<S, P> {
    store: S,
    publisher: P,
    policy: RetryPolicy,
}

impl<S: InventoryStore, P: EventPublisher> Transactor<S, P> {
    /// Create a transactor over `store`, publishing committed changes to `publisher`.
    pub fn new(store: S, publisher: P, policy: RetryPolicy) -> Self {
        Self {
            store,
            publisher,
            policy,
        }
    }

    /// Run `op` and its reactions in one unit of work.
    ///
    /// `op` may be called more than once when the store reports a conflict,
    /// so it must not keep state between calls.
    ///
    /// # Errors
    ///
    /// Returns the error of `op` or of a reaction (the unit is rolled back),
    /// or the last conflict once the attempts are exhausted.
    pub async fn run<T, F>(&self, mut op: F) -> Result<T, InventoryError>
    where
        F: for<'u> FnMut(&'u mut S::Unit, &'u mut Changes) -> UnitFuture<'u, T>,
    {
        let mut attempt = 1;
        loop {
            let mut unit = self.store.begin().await?;
            let mut changes = Changes::default();

            let outcome = match op(&mut unit, &mut changes).await {
                Ok(value) => settle(&mut unit, &mut changes).await.map(|()| value),
                Err(err) => Err(err),
            };
            let outcome = match outcome {
                Ok(value) => unit.commit().await.map(|()| value),
                Err(err) => {
                    if let Err(rollback_err) = unit.rollback().await {
                        tracing::warn!(error = %rollback_err, "rollback failed");
                    }
                    Err(err)
                }
            };

            match outcome {
                Ok(value) => {
                    self.publish(changes).await;
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    tracing::warn!(attempt, error = %err, "unit of work conflicted, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn publish(&self, changes: Changes) {
        for change in changes.into_settled() {
            if let Err(err) = self.publisher.publish(Event::new(change)).await {
                tracing::warn!(error = %err, "failed to publish inventory change");
            }
        }
    }
}
