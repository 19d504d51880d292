//! Error types shared across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`InventoryError`] via `#[from]`.

/// Top-level error returned by every inventory operation.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// A field failed a local check (empty name, port out of range, …).
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The mutation would break a structural invariant and was rejected in full.
    #[error("constraint violation")]
    Constraint(#[from] ConstraintViolation),

    /// A referenced entity does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The store reported a write conflict with a concurrent unit of work.
    #[error("write conflict")]
    Conflict(#[from] ConflictError),

    /// A derived-state reaction found the inventory in a state it cannot repair.
    #[error("internal consistency error")]
    Consistency(#[from] ConsistencyError),

    /// The storage backend failed.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl InventoryError {
    /// Whether re-running the whole unit of work may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("host must not be empty")]
    EmptyHost,

    #[error("port must be between 1 and 65535")]
    InvalidPort,
}

/// Structural invariants a mutation would break.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error(
        "host, port, and protocol must make a unique pair unless a pub/sub protocol ({host}:{port} - {protocol})"
    )]
    DuplicateEndpoint {
        host: String,
        port: u16,
        protocol: String,
    },

    #[error("transport {transport} is already associated with device {device}")]
    TransportOwned { transport: String, device: String },

    #[error("combination device/actuator slot occupied on device {device}")]
    ActuatorSlotOccupied { device: String },

    #[error("{entity} name {name:?} is already taken")]
    DuplicateName { entity: &'static str, name: String },
}

/// A referenced entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A write conflict with a concurrent unit of work; the unit may be retried.
#[derive(Debug, thiserror::Error)]
#[error("concurrent write conflict")]
pub struct ConflictError {
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// Derived state that does not match the primary entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("actuator {actuator} was classified but is missing from the store")]
    MissingActuator { actuator: String },

    #[error("profile group {profile:?} vanished while adding actuator {actuator}")]
    MissingProfileGroup { profile: String, actuator: String },
}

/// Check that `value` is non-empty and at most `max` characters long.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyName`] or [`ValidationError::TooLong`].
pub fn check_name(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    check_len(field, value, max)
}

/// Check that `value` is at most `max` characters long.
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] when the limit is exceeded.
pub fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
