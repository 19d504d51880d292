//! Device — a physical thing that hosts actuators and is reachable over transports.

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, check_name};
use crate::id::{DeviceId, prefixed_name};

/// Maximum length of a device display name.
pub const NAME_MAX_LEN: usize = 30;

/// A device known to the orchestrator.
///
/// Transport ownership is stored as an association, not on the struct; see
/// the `TransportRepository` port in the app crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub note: Option<String>,
    /// Whether the device may host more than one actuator.
    pub multi_actuator: bool,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
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

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    note: Option<String>,
    multi_actuator: bool,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn multi_actuator(mut self, multi_actuator: bool) -> Self {
        self.multi_actuator = multi_actuator;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// A missing name is replaced by a generated `Device-…` name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] if the name is empty or too long.
    pub fn build(self) -> Result<Device, InventoryError> {
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self
                .name
                .unwrap_or_else(|| prefixed_name("Device", NAME_MAX_LEN)),
            note: self.note,
            multi_actuator: self.multi_actuator,
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn should_build_valid_device_when_name_provided() {
        let device = Device::builder().name("Router A").build().unwrap();
        assert_eq!(device.name, "Router A");
        assert!(!device.multi_actuator);
        assert!(device.note.is_none());
    }

    #[test]
    fn should_generate_name_when_missing() {
        let device = Device::builder().build().unwrap();
        assert!(device.name.starts_with("Device-"));
        assert_eq!(device.name.chars().count(), NAME_MAX_LEN);
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Device::builder().name("").build();
        assert!(matches!(
            result,
            Err(InventoryError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_return_validation_error_when_name_too_long() {
        let result = Device::builder().name("x".repeat(31)).build();
        assert!(matches!(
            result,
            Err(InventoryError::Validation(ValidationError::TooLong { max: 30, .. }))
        ));
    }

    #[test]
    fn should_build_url_name() {
        let device = Device::builder().name("Edge Router 1").build().unwrap();
        assert_eq!(device.url_name(), "edge_router_1");
    }
}
