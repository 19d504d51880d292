//! Actuator service — use-cases for actuators and their profile groups.

use serde_json::Value;

use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::error::{InventoryError, NotFoundError};
use orchestrator_domain::event::Change;
use orchestrator_domain::group::ActuatorProfile;
use orchestrator_domain::id::{ActuatorId, DeviceId};
use orchestrator_domain::schema::SchemaDocument;

use crate::constraints::ConstraintEnforcer;
use crate::ports::{
    ActuatorRepository, EventPublisher, InventoryStore, ProfileRepository, UnitOfWork,
};
use crate::reactions::Changes;
use crate::transaction::{Transactor, boxed};

/// Application service for actuators.
pub struct ActuatorService<S, P> {
    tx: Transactor<S, P>,
}

impl<S, P> ActuatorService<S, P>
where
    S: InventoryStore,
    P: EventPublisher,
{
    /// Create a new service running its units through `tx`.
    pub fn new(tx: Transactor<S, P>) -> Self {
        Self { tx }
    }

    /// Create an actuator and place it in its profile group.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the referenced device does
    /// not exist, or [`InventoryError::Constraint`] when the name is taken or
    /// the device has no free actuator slot.
    #[tracing::instrument(skip(self, actuator), fields(actuator_name = %actuator.name))]
    pub async fn create_actuator(&self, actuator: Actuator) -> Result<Actuator, InventoryError> {
        actuator.validate()?;
        warn_if_malformed(actuator.id, actuator.schema());
        self.tx
            .run(|unit, changes| boxed(insert_actuator(unit, actuator.clone(), changes)))
            .await
    }

    /// Replace the schema of an actuator, re-classifying it in the same unit.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the actuator does not exist.
    #[tracing::instrument(skip(self, schema))]
    pub async fn update_actuator_schema(
        &self,
        id: ActuatorId,
        schema: Value,
    ) -> Result<Actuator, InventoryError> {
        warn_if_malformed(id, &schema);
        self.tx
            .run(|unit, changes| {
                let schema = schema.clone();
                boxed(async move {
                    let mut actuator = existing_actuator(unit, id).await?;
                    if actuator.set_schema(schema) {
                        tracing::debug!(actuator = %id, profile = %actuator.profile(), "profile changed");
                    }
                    unit.update_actuator(&actuator).await?;
                    changes.push(Change::ActuatorClassified {
                        actuator: id,
                        profile: actuator.profile().to_string(),
                    });
                    Ok(actuator)
                })
            })
            .await
    }

    /// Delete an actuator; profile groups it leaves empty are removed.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when the actuator does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_actuator(&self, id: ActuatorId) -> Result<(), InventoryError> {
        self.tx
            .run(|unit, changes| {
                boxed(async move {
                    existing_actuator(unit, id).await?;
                    remove_actuator(unit, id, changes).await
                })
            })
            .await
    }

    /// Look up an actuator by id.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when no actuator with `id` exists.
    pub async fn get_actuator(&self, id: ActuatorId) -> Result<Actuator, InventoryError> {
        self.tx
            .run(|unit, _| boxed(existing_actuator(unit, id)))
            .await
    }

    /// List all actuators.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_actuators(&self) -> Result<Vec<Actuator>, InventoryError> {
        self.tx.run(|unit, _| boxed(unit.list_actuators())).await
    }

    /// Actuators hosted by a device.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn actuators_on_device(
        &self,
        device: DeviceId,
    ) -> Result<Vec<Actuator>, InventoryError> {
        self.tx
            .run(|unit, _| boxed(unit.actuators_on_device(device)))
            .await
    }

    /// All profile groups, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn profile_groups(&self) -> Result<Vec<ActuatorProfile>, InventoryError> {
        self.tx.run(|unit, _| boxed(unit.list_profile_groups())).await
    }

    /// The profile group with the given display name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] when no such group exists.
    pub async fn profile_group(&self, name: &str) -> Result<ActuatorProfile, InventoryError> {
        self.tx
            .run(|unit, _| {
                let name = name.to_owned();
                boxed(async move {
                    unit.get_profile_group(&name).await?.ok_or_else(|| {
                        NotFoundError {
                            entity: "ActuatorProfile",
                            id: name,
                        }
                        .into()
                    })
                })
            })
            .await
    }
}

/// Insert an actuator inside an open unit after the name and placement checks.
pub(crate) async fn insert_actuator<U: UnitOfWork>(
    unit: &mut U,
    actuator: Actuator,
    changes: &mut Changes,
) -> Result<Actuator, InventoryError> {
    ConstraintEnforcer::validate_actuator_name(unit, &actuator).await?;
    if let Some(device_id) = actuator.device_id {
        let device = unit.get_device(device_id).await?.ok_or_else(|| NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        })?;
        ConstraintEnforcer::validate_actuator_placement(unit, &device).await?;
    }
    unit.insert_actuator(&actuator).await?;
    changes.push(Change::ActuatorClassified {
        actuator: actuator.id,
        profile: actuator.profile().to_string(),
    });
    Ok(actuator)
}

/// Delete an actuator inside an open unit and record the memberships it lost.
pub(crate) async fn remove_actuator<U: UnitOfWork>(
    unit: &mut U,
    id: ActuatorId,
    changes: &mut Changes,
) -> Result<(), InventoryError> {
    let profiles = unit.profiles_of(id).await?;
    unit.delete_actuator(id).await?;
    changes.push(Change::ActuatorDeleted {
        actuator: id,
        profiles,
    });
    Ok(())
}

async fn existing_actuator<U: UnitOfWork>(
    unit: &mut U,
    id: ActuatorId,
) -> Result<Actuator, InventoryError> {
    unit.get_actuator(id).await?.ok_or_else(|| {
        NotFoundError {
            entity: "Actuator",
            id: id.to_string(),
        }
        .into()
    })
}

fn warn_if_malformed(id: ActuatorId, schema: &Value) {
    if SchemaDocument::from(schema).is_malformed() {
        tracing::warn!(actuator = %id, "schema is not a mapping; using default classification");
    }
}
