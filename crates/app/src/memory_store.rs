//! In-process inventory store.
//!
//! A unit of work holds the store lock from `begin` until it is committed or
//! dropped and works on a private copy of the inventory, so units are fully
//! serialized and an abandoned unit leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::future::{Future, ready};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::{ConsistencyError, InventoryError};
use orchestrator_domain::group::{AccessGroup, ActuatorProfile, GroupKind, GroupMember};
use orchestrator_domain::id::{ActuatorId, DeviceId, TransportId};
use orchestrator_domain::transport::{Endpoint, Transport};

use crate::ports::{
    AccessGroupRepository, ActuatorRepository, DeviceRepository, InventoryStore,
    ProfileRepository, TransportRepository, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct StoredGroup {
    users: BTreeSet<String>,
    members: BTreeSet<uuid::Uuid>,
}

#[derive(Debug, Clone, Default)]
struct Inventory {
    devices: BTreeMap<DeviceId, Device>,
    transports: BTreeMap<TransportId, Transport>,
    links: BTreeSet<(TransportId, DeviceId)>,
    actuators: BTreeMap<ActuatorId, Actuator>,
    profiles: BTreeMap<String, BTreeSet<ActuatorId>>,
    access_groups: BTreeMap<(GroupKind, String), StoredGroup>,
}

impl Inventory {
    fn forget_member(&mut self, kind: GroupKind, member: uuid::Uuid) {
        for ((group_kind, _), group) in &mut self.access_groups {
            if *group_kind == kind {
                group.members.remove(&member);
            }
        }
    }

    fn remove_actuator(&mut self, id: ActuatorId) {
        self.actuators.remove(&id);
        for members in self.profiles.values_mut() {
            members.remove(&id);
        }
        self.forget_member(GroupKind::Actuator, id.as_uuid());
    }
}

/// Inventory store kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryStore {
    inner: Arc<Mutex<Inventory>>,
}

impl InMemoryInventoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for InMemoryInventoryStore {
    type Unit = InMemoryUnit;

    fn begin(&self) -> impl Future<Output = Result<InMemoryUnit, InventoryError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let guard = inner.lock_owned().await;
            let working = guard.clone();
            Ok(InMemoryUnit { guard, working })
        }
    }
}

/// A unit of work over [`InMemoryInventoryStore`].
#[derive(Debug)]
pub struct InMemoryUnit {
    guard: OwnedMutexGuard<Inventory>,
    working: Inventory,
}

impl UnitOfWork for InMemoryUnit {
    fn commit(self) -> impl Future<Output = Result<(), InventoryError>> + Send {
        let Self { mut guard, working } = self;
        *guard = working;
        ready(Ok(()))
    }

    fn rollback(self) -> impl Future<Output = Result<(), InventoryError>> + Send {
        drop(self);
        ready(Ok(()))
    }
}

impl DeviceRepository for InMemoryUnit {
    fn get_device(
        &mut self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, InventoryError>> + Send {
        ready(Ok(self.working.devices.get(&id).cloned()))
    }

    fn find_device_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, InventoryError>> + Send {
        let found = self
            .working
            .devices
            .values()
            .find(|d| d.name == name)
            .cloned();
        ready(Ok(found))
    }

    fn list_devices(&mut self) -> impl Future<Output = Result<Vec<Device>, InventoryError>> + Send {
        ready(Ok(self.working.devices.values().cloned().collect()))
    }

    fn insert_device(
        &mut self,
        device: &Device,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.devices.insert(device.id, device.clone());
        ready(Ok(()))
    }

    fn update_device(
        &mut self,
        device: &Device,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.devices.insert(device.id, device.clone());
        ready(Ok(()))
    }

    fn delete_device(
        &mut self,
        id: DeviceId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        let hosted: Vec<ActuatorId> = self
            .working
            .actuators
            .values()
            .filter(|actuator| actuator.device_id == Some(id))
            .map(|actuator| actuator.id)
            .collect();
        for actuator in hosted {
            self.working.remove_actuator(actuator);
        }
        self.working.devices.remove(&id);
        self.working.links.retain(|(_, device)| *device != id);
        self.working.forget_member(GroupKind::Device, id.as_uuid());
        ready(Ok(()))
    }
}

impl TransportRepository for InMemoryUnit {
    fn get_transport(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<Option<Transport>, InventoryError>> + Send {
        ready(Ok(self.working.transports.get(&id).cloned()))
    }

    fn list_transports(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send {
        ready(Ok(self.working.transports.values().cloned().collect()))
    }

    fn find_transports_by_endpoint(
        &mut self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send {
        let found = self
            .working
            .transports
            .values()
            .filter(|t| !t.protocol.pub_sub && t.endpoint() == *endpoint)
            .cloned()
            .collect();
        ready(Ok(found))
    }

    fn insert_transport(
        &mut self,
        transport: &Transport,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working
            .transports
            .insert(transport.id, transport.clone());
        ready(Ok(()))
    }

    fn update_transport(
        &mut self,
        transport: &Transport,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working
            .transports
            .insert(transport.id, transport.clone());
        ready(Ok(()))
    }

    fn delete_transport(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.transports.remove(&id);
        self.working.links.retain(|(transport, _)| *transport != id);
        ready(Ok(()))
    }

    fn transport_owners(
        &mut self,
        id: TransportId,
    ) -> impl Future<Output = Result<Vec<DeviceId>, InventoryError>> + Send {
        let owners = self
            .working
            .links
            .iter()
            .filter(|(transport, _)| *transport == id)
            .map(|(_, device)| *device)
            .collect();
        ready(Ok(owners))
    }

    fn device_transports(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Vec<Transport>, InventoryError>> + Send {
        let transports = self
            .working
            .links
            .iter()
            .filter(|(_, owner)| *owner == device)
            .filter_map(|(transport, _)| self.working.transports.get(transport).cloned())
            .collect();
        ready(Ok(transports))
    }

    fn link_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.links.insert((transport, device));
        ready(Ok(()))
    }

    fn unlink_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send {
        ready(Ok(self.working.links.remove(&(transport, device))))
    }
}

impl ActuatorRepository for InMemoryUnit {
    fn get_actuator(
        &mut self,
        id: ActuatorId,
    ) -> impl Future<Output = Result<Option<Actuator>, InventoryError>> + Send {
        ready(Ok(self.working.actuators.get(&id).cloned()))
    }

    fn find_actuator_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Actuator>, InventoryError>> + Send {
        let found = self
            .working
            .actuators
            .values()
            .find(|a| a.name == name)
            .cloned();
        ready(Ok(found))
    }

    fn list_actuators(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Actuator>, InventoryError>> + Send {
        ready(Ok(self.working.actuators.values().cloned().collect()))
    }

    fn actuators_on_device(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Vec<Actuator>, InventoryError>> + Send {
        let found = self
            .working
            .actuators
            .values()
            .filter(|a| a.device_id == Some(device))
            .cloned()
            .collect();
        ready(Ok(found))
    }

    fn insert_actuator(
        &mut self,
        actuator: &Actuator,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working
            .actuators
            .insert(actuator.id, actuator.clone());
        ready(Ok(()))
    }

    fn update_actuator(
        &mut self,
        actuator: &Actuator,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working
            .actuators
            .insert(actuator.id, actuator.clone());
        ready(Ok(()))
    }

    fn delete_actuator(
        &mut self,
        id: ActuatorId,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.remove_actuator(id);
        ready(Ok(()))
    }
}

impl ProfileRepository for InMemoryUnit {
    fn get_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ActuatorProfile>, InventoryError>> + Send {
        let group = self
            .working
            .profiles
            .get(name)
            .map(|actuators| ActuatorProfile {
                name: name.to_string(),
                actuators: actuators.clone(),
            });
        ready(Ok(group))
    }

    fn list_profile_groups(
        &mut self,
    ) -> impl Future<Output = Result<Vec<ActuatorProfile>, InventoryError>> + Send {
        let groups = self
            .working
            .profiles
            .iter()
            .map(|(name, actuators)| ActuatorProfile {
                name: name.clone(),
                actuators: actuators.clone(),
            })
            .collect();
        ready(Ok(groups))
    }

    fn profiles_of(
        &mut self,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<Vec<String>, InventoryError>> + Send {
        let names = self
            .working
            .profiles
            .iter()
            .filter(|(_, members)| members.contains(&actuator))
            .map(|(name, _)| name.clone())
            .collect();
        ready(Ok(names))
    }

    fn ensure_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send {
        let created = if self.working.profiles.contains_key(name) {
            false
        } else {
            self.working
                .profiles
                .insert(name.to_string(), BTreeSet::new());
            true
        };
        ready(Ok(created))
    }

    fn delete_profile_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working.profiles.remove(name);
        ready(Ok(()))
    }

    fn add_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send {
        let result = match self.working.profiles.get_mut(name) {
            Some(members) => Ok(members.insert(actuator)),
            None => Err(ConsistencyError::MissingProfileGroup {
                profile: name.to_string(),
                actuator: actuator.to_string(),
            }
            .into()),
        };
        ready(result)
    }

    fn remove_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> impl Future<Output = Result<bool, InventoryError>> + Send {
        let removed = self
            .working
            .profiles
            .get_mut(name)
            .is_some_and(|members| members.remove(&actuator));
        ready(Ok(removed))
    }
}

fn to_access_group<M: GroupMember>(name: &str, stored: &StoredGroup) -> AccessGroup<M> {
    AccessGroup {
        name: name.to_string(),
        users: stored.users.clone(),
        members: stored.members.iter().copied().map(M::from_uuid).collect(),
    }
}

impl AccessGroupRepository for InMemoryUnit {
    fn get_access_group<M: GroupMember>(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<AccessGroup<M>>, InventoryError>> + Send {
        let group = self
            .working
            .access_groups
            .get(&(M::KIND, name.to_string()))
            .map(|stored| to_access_group(name, stored));
        ready(Ok(group))
    }

    fn list_access_groups<M: GroupMember>(
        &mut self,
    ) -> impl Future<Output = Result<Vec<AccessGroup<M>>, InventoryError>> + Send {
        let groups = self
            .working
            .access_groups
            .iter()
            .filter(|((kind, _), _)| *kind == M::KIND)
            .map(|((_, name), stored)| to_access_group(name, stored))
            .collect();
        ready(Ok(groups))
    }

    fn save_access_group<M: GroupMember>(
        &mut self,
        group: &AccessGroup<M>,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        let stored = StoredGroup {
            users: group.users.clone(),
            members: group.members.iter().map(|m| m.to_uuid()).collect(),
        };
        self.working
            .access_groups
            .insert((M::KIND, group.name.clone()), stored);
        ready(Ok(()))
    }

    fn delete_access_group<M: GroupMember>(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send {
        self.working
            .access_groups
            .remove(&(M::KIND, name.to_string()));
        ready(Ok(()))
    }
}
