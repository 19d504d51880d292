//! # orchestrator-domain
//!
//! Pure domain model for the orchestrator device/actuator inventory.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define **Devices** (physical things reachable over one or more transports)
//! - Define **Transports** (host/port/protocol endpoints owned by a device)
//! - Define **Actuators** (command targets carrying a schema)
//! - Define **Groups** (derived profile groups and user-managed access groups)
//! - Classify actuator schemas into a format and profile
//! - Describe **Changes** (the notifications a committed mutation emits)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod actuator;
pub mod device;
pub mod event;
pub mod group;
pub mod schema;
pub mod transport;
