//! Access-group service — user-managed groupings of devices or actuators.
//!
//! Access groups carry no derived state; they only require unique names and
//! members that exist.

use std::marker::PhantomData;

use orchestrator_domain::error::{ConstraintViolation, InventoryError, NotFoundError};
use orchestrator_domain::group::{AccessGroup, GroupKind, GroupMember};
use orchestrator_domain::id::{ActuatorId, DeviceId};

use crate::ports::{AccessGroupRepository, EventPublisher, InventoryStore, UnitOfWork};
use crate::transaction::{Transactor, boxed};

/// Application service for access groups whose members are `M`.
pub struct GroupService<S, P, M> {
    tx: Transactor<S, P>,
    _member: PhantomData<fn() -> M>,
}

impl<S, P, M> GroupService<S, P, M>
where
    S: InventoryStore,
    P: EventPublisher,
    M: GroupMember,
{
    /// Create a new service running its units through `tx`.
    pub fn new(tx: Transactor<S, P>) -> Self {
        Self {
            tx,
            _member: PhantomData,
        }
    }

    /// Create an empty group.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] for an invalid name, or
    /// [`InventoryError::Constraint`] when the name is taken.
    #[tracing::instrument(skip(self), fields(kind = %M::KIND))]
    pub async fn create_group(&self, name: &str) -> Result<AccessGroup<M>, InventoryError> {
        let group = AccessGroup::<M>::new(name)?;
        self.tx
            .run(|unit, _| {
                let group = group.clone();
                boxed(async move {
                    if unit.get_access_group::<M>(&group.name).await?.is_some() {
                        return Err(ConstraintViolation::DuplicateName {
                            entity: label(M::KIND),
                            name: group.name,
                        }
                        .into());
                    }
                    unit.save_access_group(&group).await?;
                    Ok(group)
                })
            })
            .await
    }

    /// Look up a group by name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group does not exist.
    pub async fn get_group(&self, name: &str) -> Result<AccessGroup<M>, InventoryError> {
        self.tx
            .run(|unit, _| boxed(existing_group(unit, name.to_owned())))
            .await
    }

    /// List all groups of this kind.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_groups(&self) -> Result<Vec<AccessGroup<M>>, InventoryError> {
        self.tx
            .run(|unit, _| boxed(unit.list_access_groups::<M>()))
            .await
    }

    /// Delete a group.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group does not exist.
    #[tracing::instrument(skip(self), fields(kind = %M::KIND))]
    pub async fn delete_group(&self, name: &str) -> Result<(), InventoryError> {
        self.tx
            .run(|unit, _| {
                let name = name.to_owned();
                boxed(async move {
                    let group = existing_group::<_, M>(unit, name).await?;
                    unit.delete_access_group::<M>(&group.name).await
                })
            })
            .await
    }

    /// Grant `user` access to the group's members.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group does not exist.
    pub async fn add_user(&self, name: &str, user: &str) -> Result<AccessGroup<M>, InventoryError> {
        let user = user.to_owned();
        self.modify(name, move |group| {
            group.users.insert(user.clone());
        })
        .await
    }

    /// Revoke `user`'s access.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group does not exist.
    pub async fn remove_user(
        &self,
        name: &str,
        user: &str,
    ) -> Result<AccessGroup<M>, InventoryError> {
        let user = user.to_owned();
        self.modify(name, move |group| {
            group.users.remove(&user);
        })
        .await
    }

    /// Add an existing device or actuator to the group.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group or the member does
    /// not exist.
    #[tracing::instrument(skip(self), fields(kind = %M::KIND))]
    pub async fn add_member(&self, name: &str, member: M) -> Result<AccessGroup<M>, InventoryError> {
        self.tx
            .run(|unit, _| {
                let name = name.to_owned();
                boxed(async move {
                    let mut group = existing_group::<_, M>(unit, name).await?;
                    if !member_exists(unit, member).await? {
                        return Err(NotFoundError {
                            entity: member_entity(M::KIND),
                            id: member.to_string(),
                        }
                        .into());
                    }
                    group.members.insert(member);
                    unit.save_access_group(&group).await?;
                    Ok(group)
                })
            })
            .await
    }

    /// Remove a member from the group.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the group does not exist.
    pub async fn remove_member(
        &self,
        name: &str,
        member: M,
    ) -> Result<AccessGroup<M>, InventoryError> {
        self.modify(name, move |group| {
            group.members.remove(&member);
        })
        .await
    }

    async fn modify<F>(&self, name: &str, edit: F) -> Result<AccessGroup<M>, InventoryError>
    where
        F: Fn(&mut AccessGroup<M>) + Clone + Send + 'static,
    {
        self.tx
            .run(|unit, _| {
                let name = name.to_owned();
                let edit = edit.clone();
                boxed(async move {
                    let mut group = existing_group::<_, M>(unit, name).await?;
                    edit(&mut group);
                    unit.save_access_group(&group).await?;
                    Ok(group)
                })
            })
            .await
    }
}

fn label(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Actuator => "actuator group",
        GroupKind::Device => "device group",
    }
}

fn member_entity(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Actuator => "Actuator",
        GroupKind::Device => "Device",
    }
}

async fn existing_group<U: UnitOfWork, M: GroupMember>(
    unit: &mut U,
    name: String,
) -> Result<AccessGroup<M>, InventoryError> {
    unit.get_access_group::<M>(&name).await?.ok_or_else(|| {
        NotFoundError {
            entity: label(M::KIND),
            id: name,
        }
        .into()
    })
}

async fn member_exists<U: UnitOfWork, M: GroupMember>(
    unit: &mut U,
    member: M,
) -> Result<bool, InventoryError> {
    let uuid = member.to_uuid();
    Ok(match M::KIND {
        GroupKind::Actuator => unit
            .get_actuator(ActuatorId::from_uuid(uuid))
            .await?
            .is_some(),
        GroupKind::Device => unit.get_device(DeviceId::from_uuid(uuid)).await?.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;
    use orchestrator_domain::actuator::Actuator;
    use orchestrator_domain::device::Device;

    #[tokio::test]
    async fn should_create_and_list_groups_per_kind() {
        let h = harness();
        let devices = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        let actuators = GroupService::<_, _, ActuatorId>::new(h.tx.clone());

        devices.create_group("operators").await.unwrap();
        actuators.create_group("operators").await.unwrap();

        assert_eq!(devices.list_groups().await.unwrap().len(), 1);
        assert_eq!(actuators.list_groups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_duplicate_group_name() {
        let h = harness();
        let groups = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        groups.create_group("operators").await.unwrap();

        let result = groups.create_group("operators").await;
        assert!(matches!(
            result,
            Err(InventoryError::Constraint(ConstraintViolation::DuplicateName {
                entity: "device group",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn should_add_and_remove_users() {
        let h = harness();
        let groups = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        groups.create_group("operators").await.unwrap();

        groups.add_user("operators", "alice").await.unwrap();
        let group = groups.add_user("operators", "bob").await.unwrap();
        assert_eq!(group.user_count(), 2);

        let group = groups.remove_user("operators", "alice").await.unwrap();
        assert_eq!(group.users.into_iter().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[tokio::test]
    async fn should_reject_unknown_member() {
        let h = harness();
        let groups = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        groups.create_group("operators").await.unwrap();

        let result = groups.add_member("operators", DeviceId::new()).await;
        assert!(matches!(
            result,
            Err(InventoryError::NotFound(NotFoundError { entity: "Device", .. }))
        ));
        assert_eq!(groups.get_group("operators").await.unwrap().member_count(), 0);
    }

    #[tokio::test]
    async fn should_drop_member_when_device_deleted() {
        let h = harness();
        let groups = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        let dev = h
            .devices
            .create_device(Device::builder().name("plc").build().unwrap())
            .await
            .unwrap();
        groups.create_group("operators").await.unwrap();
        groups.add_member("operators", dev.id).await.unwrap();

        h.devices.delete_device(dev.id).await.unwrap();

        assert_eq!(groups.get_group("operators").await.unwrap().member_count(), 0);
    }

    #[tokio::test]
    async fn should_drop_member_when_actuator_deleted() {
        let h = harness();
        let groups = GroupService::<_, _, ActuatorId>::new(h.tx.clone());
        let actuator = h
            .actuators
            .create_actuator(Actuator::builder().name("slpf").build().unwrap())
            .await
            .unwrap();
        groups.create_group("operators").await.unwrap();
        let group = groups.add_member("operators", actuator.id).await.unwrap();
        assert_eq!(group.member_count(), 1);

        h.actuators.delete_actuator(actuator.id).await.unwrap();

        assert_eq!(groups.get_group("operators").await.unwrap().member_count(), 0);
    }

    #[tokio::test]
    async fn should_return_not_found_when_deleting_missing_group() {
        let h = harness();
        let groups = GroupService::<_, _, ActuatorId>::new(h.tx.clone());
        let result = groups.delete_group("nobody").await;
        assert!(matches!(result, Err(InventoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_remove_member() {
        let h = harness();
        let groups = GroupService::<_, _, DeviceId>::new(h.tx.clone());
        let dev = h
            .devices
            .create_device(Device::builder().name("plc").build().unwrap())
            .await
            .unwrap();
        groups.create_group("operators").await.unwrap();
        groups.add_member("operators", dev.id).await.unwrap();

        let group = groups.remove_member("operators", dev.id).await.unwrap();
        assert!(group.members.is_empty());
    }
}
