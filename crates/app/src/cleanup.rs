//! Cleanup of entities nothing references any more.
//!
//! - a transport with no device is deleted, after a detach or after any
//!   device deletion (the sweep covers every transport, not just the
//!   deleted device's);
//! - a profile group with no member is deleted.
//!
//! Every reaction re-reads the store, so processing the same change twice
//! has no further effect.

use orchestrator_domain::error::InventoryError;
use orchestrator_domain::event::Change;
use orchestrator_domain::id::TransportId;

use crate::ports::UnitOfWork;
use crate::reactions::Changes;

/// Deletes orphaned transports and empty profile groups.
pub struct CleanupCoordinator;

impl CleanupCoordinator {
    /// React to a single change.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn react<U: UnitOfWork>(
        unit: &mut U,
        change: &Change,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        match change {
            Change::DeviceDeleted { .. } => Self::sweep_transports(unit, changes).await,
            Change::TransportDetached { transport, .. } => {
                Self::remove_if_orphaned(unit, *transport, changes).await
            }
            Change::ProfileMemberRemoved { profile, .. } => {
                Self::remove_if_empty(unit, profile, changes).await
            }
            _ => Ok(()),
        }
    }

    async fn sweep_transports<U: UnitOfWork>(
        unit: &mut U,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        for transport in unit.list_transports().await? {
            Self::remove_if_orphaned(unit, transport.id, changes).await?;
        }
        Ok(())
    }

    async fn remove_if_orphaned<U: UnitOfWork>(
        unit: &mut U,
        transport: TransportId,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        if unit.get_transport(transport).await?.is_none() {
            return Ok(());
        }
        if unit.transport_owners(transport).await?.is_empty() {
            unit.delete_transport(transport).await?;
            tracing::debug!(%transport, "removed orphaned transport");
            changes.push(Change::TransportRemoved { transport });
        }
        Ok(())
    }

    async fn remove_if_empty<U: UnitOfWork>(
        unit: &mut U,
        profile: &str,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        let Some(group) = unit.get_profile_group(profile).await? else {
            return Ok(());
        };
        if group.actuators.is_empty() {
            unit.delete_profile_group(profile).await?;
            tracing::debug!(%profile, "removed empty profile group");
            changes.push(Change::ProfileGroupRemoved {
                profile: profile.to_string(),
            });
        }
        Ok(())
    }
}
