//! Catalog port — resolves protocol and serialization references.
//!
//! The set of valid protocols (and whether each is pub/sub) is owned by the
//! surrounding application, not by the inventory.

use orchestrator_domain::transport::{Protocol, Serialization};

/// Lookup of known protocols and serialization formats by name.
pub trait Catalog: Send + Sync {
    fn protocol(&self, name: &str) -> Option<Protocol>;

    fn serialization(&self, name: &str) -> Option<Serialization>;
}

impl<T: Catalog> Catalog for std::sync::Arc<T> {
    fn protocol(&self, name: &str) -> Option<Protocol> {
        (**self).protocol(name)
    }

    fn serialization(&self, name: &str) -> Option<Serialization> {
        (**self).serialization(name)
    }
}
