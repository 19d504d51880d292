//! # orchestratord — orchestrator inventory daemon
//!
//! Composition root that wires the inventory store, catalog and services
//! together and applies the declared inventory.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the store adapter, event bus and protocol catalog
//! - Construct application services, injecting them via port traits
//! - Apply the `[[devices]]` bootstrap and report the resulting profile groups
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod seed;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use orchestrator_app::event_bus::InProcessEventBus;
use orchestrator_app::services::actuator_service::ActuatorService;
use orchestrator_app::services::device_service::DeviceService;
use orchestrator_app::transaction::Transactor;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = config.storage().build().await?;
    let store = db.inventory_store();

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let mut events = event_bus.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event.change) {
                    Ok(change) => tracing::info!(event_id = %event.id, %change, "inventory changed"),
                    Err(err) => tracing::warn!(error = %err, "failed to encode inventory change"),
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Services
    let tx = Transactor::new(store, Arc::clone(&event_bus), config.retry_policy());
    let devices = DeviceService::new(tx.clone(), config.catalog());
    let actuators = ActuatorService::new(tx);

    let report = seed::apply(&devices, &config.devices).await?;
    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        "inventory bootstrap finished"
    );

    for group in actuators.profile_groups().await? {
        tracing::info!(
            profile = %group.name,
            actuators = group.actuator_count(),
            "profile group"
        );
    }

    // Dropping every sender closes the bus and ends the event log.
    drop(devices);
    drop(actuators);
    drop(event_bus);
    event_log.await?;

    Ok(())
}
