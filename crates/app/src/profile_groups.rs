//! Profile-group maintenance.
//!
//! Invariant: the group named `P` contains exactly the actuators whose
//! profile displays as `P`. Groups are created on first use; emptied groups
//! are left to the [`CleanupCoordinator`](crate::cleanup::CleanupCoordinator).

use orchestrator_domain::error::{ConsistencyError, InventoryError};
use orchestrator_domain::event::Change;
use orchestrator_domain::id::ActuatorId;
use orchestrator_domain::schema::display_profile;

use crate::ports::UnitOfWork;
use crate::reactions::Changes;

/// Keeps actuator profile groups in sync with actuator classification.
pub struct ProfileGroupMaintainer;

impl ProfileGroupMaintainer {
    /// React to a single change.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Consistency`] when a classified actuator is
    /// missing, or a store error.
    pub async fn react<U: UnitOfWork>(
        unit: &mut U,
        change: &Change,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        match change {
            Change::ActuatorClassified { actuator, profile } => {
                Self::assign(unit, *actuator, &display_profile(profile), changes).await
            }
            // The store already dropped the membership rows with the actuator.
            Change::ActuatorDeleted { actuator, profiles } => {
                for profile in profiles {
                    changes.push(Change::ProfileMemberRemoved {
                        profile: profile.clone(),
                        actuator: *actuator,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn assign<U: UnitOfWork>(
        unit: &mut U,
        actuator: ActuatorId,
        target: &str,
        changes: &mut Changes,
    ) -> Result<(), InventoryError> {
        if unit.get_actuator(actuator).await?.is_none() {
            return Err(ConsistencyError::MissingActuator {
                actuator: actuator.to_string(),
            }
            .into());
        }

        for current in unit.profiles_of(actuator).await? {
            if current != target && unit.remove_profile_member(&current, actuator).await? {
                tracing::debug!(%actuator, profile = %current, "left profile group");
                changes.push(Change::ProfileMemberRemoved {
                    profile: current,
                    actuator,
                });
            }
        }

        if unit.ensure_profile_group(target).await? {
            tracing::debug!(profile = %target, "created profile group");
            changes.push(Change::ProfileGroupCreated {
                profile: target.to_string(),
            });
        }

        if unit.add_profile_member(target, actuator).await? {
            tracing::debug!(%actuator, profile = %target, "joined profile group");
            changes.push(Change::ProfileMemberAdded {
                profile: target.to_string(),
                actuator,
            });
        }
        Ok(())
    }
}
