//! Actuator — a command target on a device, described by a schema.
//!
//! The schema format and profile are derived state: they are computed by
//! [`classify`] whenever the schema is set and cannot be written directly.

use serde::Serialize;
use serde_json::Value;

use crate::error::{InventoryError, check_name};
use crate::id::{ActuatorId, DeviceId, prefixed_name};
use crate::schema::{SchemaFormat, classify, display_profile};

/// Maximum length of an actuator display name.
pub const NAME_MAX_LEN: usize = 30;

/// An actuator known to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actuator {
    pub id: ActuatorId,
    pub name: String,
    pub device_id: Option<DeviceId>,
    schema: Value,
    schema_format: SchemaFormat,
    profile: String,
}

impl Actuator {
    /// Create a builder for constructing an [`Actuator`].
    #[must_use]
    pub fn builder() -> ActuatorBuilder {
        ActuatorBuilder::default()
    }

    /// Rebuild an actuator from persisted fields, re-deriving format and profile.
    #[must_use]
    pub fn restore(
        id: ActuatorId,
        name: String,
        device_id: Option<DeviceId>,
        schema: Value,
    ) -> Self {
        let mut actuator = Self {
            id,
            name,
            device_id,
            schema: Value::Null,
            schema_format: SchemaFormat::default(),
            profile: String::new(),
        };
        actuator.set_schema(schema);
        actuator
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn schema_format(&self) -> SchemaFormat {
        self.schema_format
    }

    /// Normalized profile (`Foo_Bar`, or `None` when the schema has no title).
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Name of the profile group this actuator belongs to.
    #[must_use]
    pub fn profile_group(&self) -> String {
        display_profile(&self.profile)
    }

    /// Replace the schema and re-derive format and profile.
    ///
    /// Returns `true` when the derived profile changed.
    pub fn set_schema(&mut self, schema: Value) -> bool {
        let classification = classify(&schema);
        let changed = classification.profile != self.profile;
        self.schema = schema;
        self.schema_format = classification.format;
        self.profile = classification.profile;
        changed
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] when `name` is empty or too long.
    pub fn validate(&self) -> Result<(), InventoryError> {
        check_name("name", &self.name, NAME_MAX_LEN)?;
        Ok(())
    }

    /// URL-friendly form of the name.
    #[must_use]
    pub fn url_name(&self) -> String {
        self.name.to_lowercase().replace(' ', "_")
    }
}

/// Step-by-step builder for [`Actuator`].
#[derive(Debug, Default)]
pub struct ActuatorBuilder {
    id: Option<ActuatorId>,
    name: Option<String>,
    device_id: Option<DeviceId>,
    schema: Option<Value>,
}

impl ActuatorBuilder {
    #[must_use]
    pub fn id(mut self, id: ActuatorId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Consume the builder, classify the schema, validate, and return an [`Actuator`].
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] if the name is empty or too long.
    pub fn build(self) -> Result<Actuator, InventoryError> {
        let actuator = Actuator::restore(
            self.id.unwrap_or_default(),
            self.name
                .unwrap_or_else(|| prefixed_name("Actuator", NAME_MAX_LEN)),
            self.device_id,
            self.schema
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        );
        actuator.validate()?;
        Ok(actuator)
    }
}
