//! Groups of actuators and devices.
//!
//! - [`ActuatorProfile`] is derived: its membership always mirrors the
//!   actuators whose profile displays as the group name, and it is never edited
//!   by a user.
//! - [`AccessGroup`] is user-managed: a named set of users granted access to a
//!   set of actuators ([`ActuatorGroup`]) or devices ([`DeviceGroup`]).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, check_name};
use crate::id::{ActuatorId, DeviceId};

/// Maximum length of a group name.
pub const NAME_MAX_LEN: usize = 80;

/// Derived group of actuators sharing a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorProfile {
    pub name: String,
    pub actuators: BTreeSet<ActuatorId>,
}

impl ActuatorProfile {
    #[must_use]
    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }
}

/// The kind of entity an access group grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Actuator,
    Device,
}

impl GroupKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actuator => "actuator",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier that can be a member of an [`AccessGroup`].
pub trait GroupMember: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const KIND: GroupKind;

    fn to_uuid(self) -> uuid::Uuid;

    fn from_uuid(uuid: uuid::Uuid) -> Self;
}

impl GroupMember for ActuatorId {
    const KIND: GroupKind = GroupKind::Actuator;

    fn to_uuid(self) -> uuid::Uuid {
        self.as_uuid()
    }

    fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl GroupMember for DeviceId {
    const KIND: GroupKind = GroupKind::Device;

    fn to_uuid(self) -> uuid::Uuid {
        self.as_uuid()
    }

    fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

/// A user-managed group granting `users` access to `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroup<M: Ord> {
    pub name: String,
    pub users: BTreeSet<String>,
    pub members: BTreeSet<M>,
}

/// Users granted access to a set of actuators.
pub type ActuatorGroup = AccessGroup<ActuatorId>;
/// Users granted access to a set of devices.
pub type DeviceGroup = AccessGroup<DeviceId>;

impl<M: GroupMember> AccessGroup<M> {
    /// Create an empty group after validating its name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] when `name` is empty or too long.
    pub fn new(name: impl Into<String>) -> Result<Self, InventoryError> {
        let group = Self {
            name: name.into(),
            users: BTreeSet::new(),
            members: BTreeSet::new(),
        };
        check_name("name", &group.name, NAME_MAX_LEN)?;
        Ok(group)
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn should_create_empty_access_group() {
        let group = DeviceGroup::new("operators").unwrap();
        assert_eq!(group.user_count(), 0);
        assert_eq!(group.member_count(), 0);
    }

    #[test]
    fn should_reject_group_name_over_limit() {
        let result = ActuatorGroup::new("g".repeat(81));
        assert!(matches!(
            result,
            Err(InventoryError::Validation(ValidationError::TooLong { max: 80, .. }))
        ));
    }

    #[test]
    fn should_expose_member_kind() {
        assert_eq!(<ActuatorId as GroupMember>::KIND, GroupKind::Actuator);
        assert_eq!(<DeviceId as GroupMember>::KIND.as_str(), "device");
    }

    #[test]
    fn should_roundtrip_member_through_uuid() {
        let id = ActuatorId::new();
        assert_eq!(<ActuatorId as GroupMember>::from_uuid(id.to_uuid()), id);
    }
}
