//! Declarative inventory bootstrap.
//!
//! Devices listed under `[[devices]]` are created together with their
//! transports and actuators in one unit of work each. A device whose name
//! already exists is left untouched, so applying the same file twice changes
//! nothing, and a rejected device leaves no partial state behind.

use serde::Deserialize;
use serde_json::Value;

use orchestrator_app::ports::{Catalog, EventPublisher, InventoryStore};
use orchestrator_app::services::device_service::{DeviceService, NewTransport};
use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::transport::{DEFAULT_HOST, DEFAULT_PORT};

/// A device to create at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSeed {
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub multi_actuator: bool,
    #[serde(default)]
    pub transports: Vec<TransportSeed>,
    #[serde(default)]
    pub actuators: Vec<ActuatorSeed>,
}

/// A transport attached to a seeded device.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSeed {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub protocol: String,
    #[serde(default)]
    pub serializations: Vec<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// An actuator hosted by a seeded device, with an inline schema.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorSeed {
    pub name: String,
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn empty_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

impl From<&TransportSeed> for NewTransport {
    fn from(seed: &TransportSeed) -> Self {
        Self {
            host: seed.host.clone(),
            port: seed.port,
            protocol: seed.protocol.clone(),
            serializations: seed.serializations.clone(),
            topic: seed.topic.clone(),
            channel: seed.channel.clone(),
        }
    }
}

/// What a bootstrap run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Create every seeded device that does not exist yet.
///
/// # Errors
///
/// Stops at the first rejected device and returns its error. Devices stored
/// before it are kept; the rejected one is stored not at all.
pub async fn apply<S, P, C>(
    devices: &DeviceService<S, P, C>,
    seeds: &[DeviceSeed],
) -> Result<SeedReport, InventoryError>
where
    S: InventoryStore,
    P: EventPublisher,
    C: Catalog,
{
    let mut report = SeedReport::default();
    for seed in seeds {
        if devices.find_device_by_name(&seed.name).await?.is_some() {
            tracing::info!(device = %seed.name, "device already present, skipping");
            report.skipped += 1;
            continue;
        }

        let mut builder = Device::builder()
            .name(seed.name.clone())
            .multi_actuator(seed.multi_actuator);
        if let Some(note) = &seed.note {
            builder = builder.note(note.clone());
        }
        let transports: Vec<NewTransport> = seed.transports.iter().map(Into::into).collect();
        let actuators = seed
            .actuators
            .iter()
            .map(|actuator| {
                Actuator::builder()
                    .name(actuator.name.clone())
                    .schema(actuator.schema.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let registration = devices
            .register_device(builder.build()?, &transports, actuators)
            .await
            .inspect_err(|err| {
                tracing::error!(device = %seed.name, error = %err, "device rejected");
            })?;

        for transport in &registration.transports {
            tracing::debug!(device = %seed.name, %transport, "transport attached");
        }
        for actuator in &registration.actuators {
            tracing::debug!(
                device = %seed.name,
                actuator = %actuator.name,
                profile = %actuator.profile_group(),
                "actuator created"
            );
        }
        tracing::info!(device = %registration.device.name, "device created");
        report.created += 1;
    }
    Ok(report)
}
