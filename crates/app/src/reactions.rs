//! Reaction pipeline — drains the changes of a unit of work before it commits.
//!
//! Each change is handed, in this order, to:
//! 1. [`ProfileGroupMaintainer`]: moves classified actuators into their
//!    profile group;
//! 2. [`CleanupCoordinator`]: deletes transports and profile groups that are
//!    no longer referenced.
//!
//! Reactions may push further changes (a removed membership, a deleted
//! group); those are processed by the same loop until nothing is pending.
//! Classification itself happens at write time, before the change is pushed.

use std::collections::VecDeque;

use orchestrator_domain::error::InventoryError;
use orchestrator_domain::event::Change;

use crate::cleanup::CleanupCoordinator;
use crate::ports::UnitOfWork;
use crate::profile_groups::ProfileGroupMaintainer;

/// Changes recorded by one unit of work.
#[derive(Debug, Default)]
pub struct Changes {
    pending: VecDeque<Change>,
    settled: Vec<Change>,
}

impl Changes {
    /// Record a change for the reactions to process.
    pub fn push(&mut self, change: Change) {
        self.pending.push_back(change);
    }

    /// Changes every reaction has already seen, in processing order.
    #[must_use]
    pub fn settled(&self) -> &[Change] {
        &self.settled
    }

    pub(crate) fn into_settled(self) -> Vec<Change> {
        self.settled
    }
}

/// Run every reaction until no change is pending.
///
/// # Errors
///
/// Propagates store errors and [`InventoryError::Consistency`] from reactions.
pub async fn settle<U: UnitOfWork>(
    unit: &mut U,
    changes: &mut Changes,
) -> Result<(), InventoryError> {
    while let Some(change) = changes.pending.pop_front() {
        ProfileGroupMaintainer::react(unit, &change, changes).await?;
        CleanupCoordinator::react(unit, &change, changes).await?;
        changes.settled.push(change);
    }
    Ok(())
}
