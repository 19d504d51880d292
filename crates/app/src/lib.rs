//! # orchestrator-app
//!
//! Application layer — use-cases, **port definitions** (traits), and the
//! integrity engine that keeps the inventory consistent.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `InventoryStore` / `UnitOfWork` — atomic access to devices, transports,
//!     actuators, profile groups and access groups
//!   - `Catalog` — known protocols and serializations
//!   - `EventPublisher` — fan-out of committed changes
//! - Check uniqueness and cardinality rules (`ConstraintEnforcer`) inside the
//!   unit of work of the mutation they guard
//! - Settle derived state before commit: profile-group membership
//!   (`ProfileGroupMaintainer`) and removal of orphaned entities
//!   (`CleanupCoordinator`)
//! - Expose use-cases as services (`DeviceService`, `ActuatorService`,
//!   `GroupService`)
//! - Provide in-process infrastructure that doesn't need IO (memory store,
//!   event bus, static catalog)
//!
//! ## Dependency rule
//! Depends on `orchestrator-domain` only (plus `tokio::sync`). Never imports
//! adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod catalog;
pub mod cleanup;
pub mod constraints;
pub mod event_bus;
pub mod memory_store;
pub mod ports;
pub mod profile_groups;
pub mod reactions;
pub mod services;
pub mod transaction;

#[cfg(test)]
mod testing;
