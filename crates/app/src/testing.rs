//! Shared fixtures for service tests.

use std::sync::Arc;

use orchestrator_domain::transport::{Protocol, Serialization};

use crate::catalog::StaticCatalog;
use crate::event_bus::InProcessEventBus;
use crate::memory_store::InMemoryInventoryStore;
use crate::services::actuator_service::ActuatorService;
use crate::services::device_service::DeviceService;
use crate::transaction::{RetryPolicy, Transactor};

pub(crate) type TestTransactor = Transactor<InMemoryInventoryStore, Arc<InProcessEventBus>>;

pub(crate) struct Harness {
    pub tx: TestTransactor,
    pub bus: Arc<InProcessEventBus>,
    pub devices: DeviceService<InMemoryInventoryStore, Arc<InProcessEventBus>, StaticCatalog>,
    pub actuators: ActuatorService<InMemoryInventoryStore, Arc<InProcessEventBus>>,
}

pub(crate) fn catalog() -> StaticCatalog {
    let protocol = |name: &str, pub_sub| Protocol {
        name: name.to_string(),
        pub_sub,
    };
    StaticCatalog::new(
        [
            protocol("HTTP", false),
            protocol("HTTPS", false),
            protocol("CoAP", false),
            protocol("MQTT", true),
        ],
        ["JSON", "CBOR"].map(|name| Serialization {
            name: name.to_string(),
        }),
    )
}

pub(crate) fn harness() -> Harness {
    let bus = Arc::new(InProcessEventBus::new(64));
    let tx = Transactor::new(
        InMemoryInventoryStore::new(),
        Arc::clone(&bus),
        RetryPolicy::default(),
    );
    Harness {
        devices: DeviceService::new(tx.clone(), catalog()),
        actuators: ActuatorService::new(tx.clone()),
        tx,
        bus,
    }
}
