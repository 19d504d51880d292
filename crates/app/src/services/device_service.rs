//! Device service — use-cases for devices and their transports.

use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::{InventoryError, NotFoundError};
use orchestrator_domain::event::Change;
use orchestrator_domain::id::{DeviceId, TransportId};
use orchestrator_domain::transport::Transport;

use crate::constraints::ConstraintEnforcer;
use crate::ports::{
    ActuatorRepository, Catalog, DeviceRepository, EventPublisher, InventoryStore,
    TransportRepository, UnitOfWork,
};
use crate::reactions::Changes;
use crate::services::actuator_service::{insert_actuator, remove_actuator};
use crate::transaction::{Transactor, boxed};

/// Fields of a transport as submitted by a caller, before catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransport {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub serializations: Vec<String>,
    pub topic: Option<String>,
    pub channel: Option<String>,
}

impl NewTransport {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, protocol: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: protocol.into(),
            serializations: Vec::new(),
            topic: None,
            channel: None,
        }
    }

    #[must_use]
    pub fn serialization(mut self, name: impl Into<String>) -> Self {
        self.serializations.push(name.into());
        self
    }

    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Everything stored by [`DeviceService::register_device`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub device: Device,
    pub transports: Vec<Transport>,
    pub actuators: Vec<Actuator>,
}

/// Application service for devices and transports.
pub struct DeviceService<S, P, C> {
    tx: Transactor<S, P>,
    catalog: C,
}

impl<S, P, C> DeviceService<S, P, C>
where
    S: InventoryStore,
    P: EventPublisher,
    C: Catalog,
{
    /// Create a new service running its units through `tx`.
    pub fn new(tx: Transactor<S, P>, catalog: C) -> Self {
        Self { tx, catalog }
    }

    /// Create a device.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] if invariants fail, or
    /// [`InventoryError::Constraint`] when the name is taken.
    #[tracing::instrument(skip(self, device), fields(device_name = %device.name))]
    pub async fn create_device(&self, device: Device) -> Result<Device, InventoryError> {
        device.validate()?;
        self.tx
            .run(|unit, changes| {
                let device = device.clone();
                boxed(async move {
                    ConstraintEnforcer::validate_device_name(unit, &device).await?;
                    unit.insert_device(&device).await?;
                    changes.push(Change::DeviceCreated { device: device.id });
                    Ok(device)
                })
            })
            .await
    }

    /// Look up a device by id.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when no device with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_device(&self, id: DeviceId) -> Result<Device, InventoryError> {
        self.tx
            .run(|unit, _| boxed(existing_device(unit, id)))
            .await
    }

    /// Look up a device by its display name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find_device_by_name(&self, name: &str) -> Result<Option<Device>, InventoryError> {
        self.tx
            .run(|unit, _| {
                let name = name.to_owned();
                boxed(async move { unit.find_device_by_name(&name).await })
            })
            .await
    }

    /// List all devices.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_devices(&self) -> Result<Vec<Device>, InventoryError> {
        self.tx.run(|unit, _| boxed(unit.list_devices())).await
    }

    /// Update the name, note and capability flag of a device.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the device does not exist,
    /// [`InventoryError::Validation`] or [`InventoryError::Constraint`] when
    /// the new values are invalid or the name is taken.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn update_device(&self, device: Device) -> Result<Device, InventoryError> {
        device.validate()?;
        self.tx
            .run(|unit, changes| {
                let device = device.clone();
                boxed(async move {
                    existing_device(unit, device.id).await?;
                    ConstraintEnforcer::validate_device_name(unit, &device).await?;
                    unit.update_device(&device).await?;
                    changes.push(Change::DeviceUpdated { device: device.id });
                    Ok(device)
                })
            })
            .await
    }

    /// Delete a device, its actuators, and every transport left without a device.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the device does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_device(&self, id: DeviceId) -> Result<(), InventoryError> {
        self.tx
            .run(|unit, changes| {
                boxed(async move {
                    existing_device(unit, id).await?;
                    for actuator in unit.actuators_on_device(id).await? {
                        remove_actuator(unit, actuator.id, changes).await?;
                    }
                    unit.delete_device(id).await?;
                    changes.push(Change::DeviceDeleted { device: id });
                    Ok(())
                })
            })
            .await
    }

    /// Create a transport that is not yet attached to any device.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown protocol or
    /// serialization, [`InventoryError::Validation`] for invalid fields, or
    /// [`InventoryError::Constraint`] when the endpoint is already in use.
    #[tracing::instrument(skip(self, request), fields(host = %request.host, port = request.port))]
    pub async fn create_transport(&self, request: NewTransport) -> Result<Transport, InventoryError> {
        let transport = self.resolve(&request, TransportId::new())?;
        self.tx
            .run(|unit, changes| {
                let transport = transport.clone();
                boxed(async move {
                    insert_transport(unit, &transport, changes).await?;
                    Ok(transport)
                })
            })
            .await
    }

    /// Create a transport and attach it to `device` in one unit of work.
    ///
    /// # Errors
    ///
    /// As [`Self::create_transport`], plus [`InventoryError::NotFound`] when
    /// the device does not exist.
    #[tracing::instrument(skip(self, request), fields(host = %request.host, port = request.port))]
    pub async fn add_transport(
        &self,
        device: DeviceId,
        request: NewTransport,
    ) -> Result<Transport, InventoryError> {
        let transport = self.resolve(&request, TransportId::new())?;
        self.tx
            .run(|unit, changes| {
                let transport = transport.clone();
                boxed(async move {
                    existing_device(unit, device).await?;
                    attach_new_transport(unit, device, &transport, changes).await?;
                    Ok(transport)
                })
            })
            .await
    }

    /// Create a device together with its transports and actuators in one
    /// unit of work.
    ///
    /// Either everything is stored, or nothing is. Each actuator is placed on
    /// the new device regardless of its own `device_id`.
    ///
    /// # Errors
    ///
    /// As [`Self::create_device`], [`Self::create_transport`] and
    /// [`ActuatorService::create_actuator`](crate::services::actuator_service::ActuatorService::create_actuator).
    #[tracing::instrument(skip_all, fields(device_name = %device.name))]
    pub async fn register_device(
        &self,
        device: Device,
        requests: &[NewTransport],
        actuators: Vec<Actuator>,
    ) -> Result<Registration, InventoryError> {
        device.validate()?;
        let transports = requests
            .iter()
            .map(|request| self.resolve(request, TransportId::new()))
            .collect::<Result<Vec<_>, _>>()?;
        let actuators = actuators
            .into_iter()
            .map(|mut actuator| {
                actuator.device_id = Some(device.id);
                actuator.validate().map(|()| actuator)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.tx
            .run(|unit, changes| {
                let device = device.clone();
                let transports = transports.clone();
                let actuators = actuators.clone();
                boxed(async move {
                    ConstraintEnforcer::validate_device_name(unit, &device).await?;
                    unit.insert_device(&device).await?;
                    changes.push(Change::DeviceCreated { device: device.id });
                    for transport in &transports {
                        attach_new_transport(unit, device.id, transport, changes).await?;
                    }
                    let mut created = Vec::with_capacity(actuators.len());
                    for actuator in actuators {
                        created.push(insert_actuator(unit, actuator, changes).await?);
                    }
                    Ok(Registration {
                        device,
                        transports,
                        actuators: created,
                    })
                })
            })
            .await
    }

    /// Replace the fields of an existing transport.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the transport, protocol or a
    /// serialization is unknown, or [`InventoryError::Constraint`] when the
    /// new endpoint is used by another transport.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_transport(
        &self,
        id: TransportId,
        request: NewTransport,
    ) -> Result<Transport, InventoryError> {
        let transport = self.resolve(&request, id)?;
        self.tx
            .run(|unit, changes| {
                let transport = transport.clone();
                boxed(async move {
                    existing_transport(unit, id).await?;
                    ConstraintEnforcer::validate_transport_uniqueness(unit, &transport).await?;
                    unit.update_transport(&transport).await?;
                    changes.push(Change::TransportUpdated { transport: id });
                    Ok(transport)
                })
            })
            .await
    }

    /// Look up a transport by id.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when no transport with `id` exists.
    pub async fn get_transport(&self, id: TransportId) -> Result<Transport, InventoryError> {
        self.tx
            .run(|unit, _| boxed(existing_transport(unit, id)))
            .await
    }

    /// List all transports.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_transports(&self) -> Result<Vec<Transport>, InventoryError> {
        self.tx.run(|unit, _| boxed(unit.list_transports())).await
    }

    /// Transports attached to a device.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the device does not exist.
    pub async fn device_transports(&self, device: DeviceId) -> Result<Vec<Transport>, InventoryError> {
        self.tx
            .run(|unit, _| {
                boxed(async move {
                    existing_device(unit, device).await?;
                    unit.device_transports(device).await
                })
            })
            .await
    }

    /// Attach an existing transport to a device.
    ///
    /// Attaching a transport to the device that already owns it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if either side does not exist, or
    /// [`InventoryError::Constraint`] when another device owns the transport.
    #[tracing::instrument(skip(self))]
    pub async fn attach_transport(
        &self,
        device: DeviceId,
        transport: TransportId,
    ) -> Result<(), InventoryError> {
        self.tx
            .run(|unit, changes| {
                boxed(async move {
                    existing_device(unit, device).await?;
                    existing_transport(unit, transport).await?;
                    ConstraintEnforcer::validate_transport_cardinality(unit, transport, device)
                        .await?;
                    if unit.transport_owners(transport).await?.contains(&device) {
                        return Ok(());
                    }
                    unit.link_transport(device, transport).await?;
                    changes.push(Change::TransportAttached { device, transport });
                    Ok(())
                })
            })
            .await
    }

    /// Detach a transport from its device; the transport is then deleted.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the transport is not
    /// attached to `device`.
    #[tracing::instrument(skip(self))]
    pub async fn detach_transport(
        &self,
        device: DeviceId,
        transport: TransportId,
    ) -> Result<(), InventoryError> {
        self.tx
            .run(|unit, changes| {
                boxed(async move {
                    if !unit.unlink_transport(device, transport).await? {
                        return Err(NotFoundError {
                            entity: "DeviceTransport",
                            id: format!("{device}/{transport}"),
                        }
                        .into());
                    }
                    changes.push(Change::TransportDetached { device, transport });
                    Ok(())
                })
            })
            .await
    }

    fn resolve(&self, request: &NewTransport, id: TransportId) -> Result<Transport, InventoryError> {
        let protocol = self
            .catalog
            .protocol(&request.protocol)
            .ok_or_else(|| NotFoundError {
                entity: "Protocol",
                id: request.protocol.clone(),
            })?;
        let mut builder = Transport::builder(protocol)
            .id(id)
            .host(request.host.clone())
            .port(request.port);
        for name in &request.serializations {
            let serialization = self
                .catalog
                .serialization(name)
                .ok_or_else(|| NotFoundError {
                    entity: "Serialization",
                    id: name.clone(),
                })?;
            builder = builder.serialization(serialization);
        }
        if let Some(topic) = &request.topic {
            builder = builder.topic(topic.clone());
        }
        if let Some(channel) = &request.channel {
            builder = builder.channel(channel.clone());
        }
        builder.build()
    }
}

async fn existing_device<U: UnitOfWork>(unit: &mut U, id: DeviceId) -> Result<Device, InventoryError> {
    unit.get_device(id).await?.ok_or_else(|| {
        NotFoundError {
            entity: "Device",
            id: id.to_string(),
        }
        .into()
    })
}

async fn existing_transport<U: UnitOfWork>(
    unit: &mut U,
    id: TransportId,
) -> Result<Transport, InventoryError> {
    unit.get_transport(id).await?.ok_or_else(|| {
        NotFoundError {
            entity: "Transport",
            id: id.to_string(),
        }
        .into()
    })
}

async fn insert_transport<U: UnitOfWork>(
    unit: &mut U,
    transport: &Transport,
    changes: &mut Changes,
) -> Result<(), InventoryError> {
    ConstraintEnforcer::validate_transport_uniqueness(unit, transport).await?;
    unit.insert_transport(transport).await?;
    changes.push(Change::TransportCreated {
        transport: transport.id,
    });
    Ok(())
}

async fn attach_new_transport<U: UnitOfWork>(
    unit: &mut U,
    device: DeviceId,
    transport: &Transport,
    changes: &mut Changes,
) -> Result<(), InventoryError> {
    insert_transport(unit, transport, changes).await?;
    unit.link_transport(device, transport.id).await?;
    changes.push(Change::TransportAttached {
        device,
        transport: transport.id,
    });
    Ok(())
}
