//! Structural checks run inside the unit of work of the mutation they guard.
//!
//! Every check reads the store through the same unit that will perform the
//! write, so a check and its write are isolated from concurrent units
//! together.

use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::{ConstraintViolation, InventoryError};
use orchestrator_domain::id::{DeviceId, TransportId};
use orchestrator_domain::transport::Transport;

use crate::ports::{ActuatorRepository, DeviceRepository, TransportRepository};

/// Rejects mutations that would break uniqueness or cardinality invariants.
pub struct ConstraintEnforcer;

impl ConstraintEnforcer {
    /// A connection-scoped `(host, port, protocol)` may be used by one transport only.
    ///
    /// `transport` itself is ignored, so the check also guards updates.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation::DuplicateEndpoint`] when another
    /// transport already uses the endpoint.
    pub async fn validate_transport_uniqueness<U: TransportRepository>(
        unit: &mut U,
        transport: &Transport,
    ) -> Result<(), InventoryError> {
        let Some(endpoint) = transport.exclusive_endpoint() else {
            return Ok(());
        };
        let taken = unit
            .find_transports_by_endpoint(&endpoint)
            .await?
            .iter()
            .any(|other| other.id != transport.id);
        if taken {
            return Err(ConstraintViolation::DuplicateEndpoint {
                host: endpoint.host,
                port: endpoint.port,
                protocol: endpoint.protocol,
            }
            .into());
        }
        Ok(())
    }

    /// A transport belongs to at most one device.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation::TransportOwned`] when the transport is
    /// linked to a device other than `device`.
    pub async fn validate_transport_cardinality<U: TransportRepository>(
        unit: &mut U,
        transport: TransportId,
        device: DeviceId,
    ) -> Result<(), InventoryError> {
        let owners = unit.transport_owners(transport).await?;
        if let Some(owner) = owners.into_iter().find(|owner| *owner != device) {
            return Err(ConstraintViolation::TransportOwned {
                transport: transport.to_string(),
                device: owner.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// A single-actuator device that already hosts one actuator is full.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation::ActuatorSlotOccupied`].
    pub async fn validate_actuator_placement<U: ActuatorRepository>(
        unit: &mut U,
        device: &Device,
    ) -> Result<(), InventoryError> {
        if device.multi_actuator {
            return Ok(());
        }
        if unit.actuators_on_device(device.id).await?.len() == 1 {
            return Err(ConstraintViolation::ActuatorSlotOccupied {
                device: device.id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Device names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation::DuplicateName`].
    pub async fn validate_device_name<U: DeviceRepository>(
        unit: &mut U,
        device: &Device,
    ) -> Result<(), InventoryError> {
        match unit.find_device_by_name(&device.name).await? {
            Some(other) if other.id != device.id => Err(ConstraintViolation::DuplicateName {
                entity: "device",
                name: device.name.clone(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Actuator names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation::DuplicateName`].
    pub async fn validate_actuator_name<U: ActuatorRepository>(
        unit: &mut U,
        actuator: &Actuator,
    ) -> Result<(), InventoryError> {
        match unit.find_actuator_by_name(&actuator.name).await? {
            Some(other) if other.id != actuator.id => Err(ConstraintViolation::DuplicateName {
                entity: "actuator",
                name: actuator.name.clone(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
