//! # orchestrator-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `InventoryStore` / `UnitOfWork` ports defined in
//!   `orchestrator-app::ports::storage`, one sqlx transaction per unit
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//! - Back the inventory invariants with storage constraints (exclusive
//!   endpoint index, single owner per transport, single profile per
//!   actuator) and report their violations as retryable conflicts
//!
//! ## Dependency rule
//! Depends on `orchestrator-app` (for port traits) and `orchestrator-domain`
//! (for domain types). The `app` and `domain` crates must never reference
//! this adapter.

pub mod access_group_repo;
pub mod actuator_repo;
pub mod device_repo;
pub mod error;
pub mod pool;
pub mod profile_repo;
pub mod store;
pub mod transport_repo;

pub use pool::{Config, Database};
pub use store::{SqliteInventoryStore, SqliteUnit};
