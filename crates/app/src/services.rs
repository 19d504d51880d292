//! Application services — use-case implementations.
//!
//! Each service wraps a [`Transactor`](crate::transaction::Transactor), so
//! every call runs as one unit of work with its constraint checks and
//! reactions, generic over the store and publisher implementations.

pub mod actuator_service;
pub mod device_service;
pub mod group_service;
