//! Storage port — an inventory store that hands out atomic units of work.
//!
//! Every read and write of a logical mutation goes through one [`UnitOfWork`].
//! A unit is isolated from concurrent units until [`UnitOfWork::commit`];
//! dropping it, or calling [`UnitOfWork::rollback`], discards every write.
//!
//! Stores either serialize units (the in-memory store holds a lock for the
//! lifetime of a unit) or enforce uniqueness themselves and report a racing
//! writer as [`InventoryError::Conflict`], in which case the unit is retried.
//!
//! Deleting a device, transport or actuator also deletes the association
//! rows that reference it (transport links, profile and access-group
//! memberships). Derived-state reactions run on top of that.

use std::future::Future;
use std::sync::Arc;

use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::group::{AccessGroup, ActuatorProfile, GroupMember};
use orchestrator_domain::id::{ActuatorId, DeviceId, TransportId};
use orchestrator_domain::transport::{Endpoint, Transport};

/// Source of units of work.
pub trait InventoryStore: Send + Sync {
    type Unit: UnitOfWork + Send + 'static;

    /// Start a new unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, InventoryError>> + Send;
}

impl<T: InventoryStore> InventoryStore for Arc<T> {
    type Unit = T::Unit;

    fn begin(&self) -> impl Future<Output = Result<Self::Unit, InventoryError>> + Send {
        (**self).begin()
    }
}

/// One atomic, isolated set of reads and writes.
pub trait UnitOfWork:
    DeviceRepository
    + TransportRepository
    + ActuatorRepository
    + ProfileRepository
    + AccessGroupRepository
    + Sized
{
    /// Make every write of this unit visible.
    fn commit(self) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Discard every write of this unit.
    fn rollback(self) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// Devices.
pub trait DeviceRepository {
    fn get_device(
        &mut self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, InventoryError>> + Send;

    fn find_device_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, InventoryError>> + Send;

    fn list_devices(&mut self) -> impl Future<Output = Result<Vec<Device>, InventoryError>> + Send;

    fn insert_device(
        &mut self,
        device: &Device,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn update_device(
        &mut self,
        device: &Device,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Delete the device and its transport links and access-group memberships.
    ///
    /// Actuators hosted by the device are deleted with it, as by
    /// [`ActuatorRepository::delete_actuator`]. Profile groups they leave
    /// empty are kept; callers that maintain groups remove actuators first.
    fn delete_device(
        &mut self,
        id: DeviceId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// Transports and their device links.
pub trait TransportRepository {
    fn get_transport(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<Option<Transport>, InventoryError>> + Send;

    fn list_transports(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send;

    /// Transports of a connection-scoped protocol bound to `endpoint`.
    fn find_transports_by_endpoint(
        &mut self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send;

    fn insert_transport(
        &mut self,
        transport: &Transport,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn update_transport(
        &mut self,
        transport: &Transport,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Delete the transport and its device links.
    fn delete_transport(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Devices the transport is linked to.
    fn transport_owners(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<Vec<DeviceId>, InventoryError>> + Send;

    /// Transports linked to the device.
    fn device_transports(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send;

    fn link_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Remove a link; returns `false` when it did not exist.
    fn unlink_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send;
}

/// Actuators.
pub trait ActuatorRepository {
    fn get_actuator(
        &mut self,
        id: ActuatorId,
    ) -> impl Future<Output = Result<Option<Actuator>, InventoryError>> + Send;

    fn find_actuator_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Actuator>, InventoryError>> + Send;

    fn list_actuators(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Actuator>, InventoryError>> + Send;

    fn actuators_on_device(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Vec<Actuator>, InventoryError>> + Send;

    fn insert_actuator(
        &mut self,
        actuator: &Actuator,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn update_actuator(
        &mut self,
        actuator: &Actuator,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Delete the actuator and its profile and access-group memberships.
    fn delete_actuator(
        &mut self,
        id: ActuatorId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// Derived profile groups.
pub trait ProfileRepository {
    fn get_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ActuatorProfile>, InventoryError>> + Send;

    fn list_profile_groups(
        &mut self,
    ) -> impl Future<Output = Result<Vec<ActuatorProfile>, InventoryError>> + Send;

    /// Names of the profile groups the actuator belongs to.
    fn profiles_of(
        &mut self,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<Vec<String>, InventoryError>> + Send;

    /// Create the group if missing; returns `true` when it was created.
    fn ensure_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send;

    fn delete_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Add a member; returns `false` when it was already present.
    fn add_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send;

    /// Remove a member; returns `false` when it was not present.
    fn remove_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send;
}

/// User-managed access groups, keyed by member kind and name.
pub trait AccessGroupRepository {
    fn get_access_group<M: GroupMember>(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<AccessGroup<M>>, InventoryError>> + Send;

    fn list_access_groups<M: GroupMember>(
        &mut self,
    ) -> impl Future<Output = Result<Vec<AccessGroup<M>>, InventoryError>> + Send;

    /// Insert the group or replace its users and members.
    fn save_access_group<M: GroupMember>(
        &mut self,
        group: &AccessGroup<M>,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn delete_access_group<M: GroupMember>(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;
}
