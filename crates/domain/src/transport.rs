//! Transport — a host/port/protocol endpoint through which a device is reached.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, ValidationError, check_len};
use crate::id::TransportId;

/// Maximum length of a transport host.
pub const HOST_MAX_LEN: usize = 60;
/// Maximum length of a topic or channel.
pub const TOPIC_MAX_LEN: usize = 30;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOPIC: &str = "topic";
pub const DEFAULT_CHANNEL: &str = "channel";

/// A protocol a transport speaks, as resolved from the protocol catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    /// Delivery is topic/channel scoped, so endpoints may be shared.
    pub pub_sub: bool,
}

/// A serialization format, as resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Serialization {
    pub name: String,
}

/// The `(host, port, protocol)` triple that must be unique for connection-scoped protocols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.host, self.port, self.protocol)
    }
}

/// A transport endpoint of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    pub id: TransportId,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub serializations: BTreeSet<Serialization>,
    pub topic: String,
    pub channel: String,
}

impl Transport {
    /// Create a builder; the protocol is the only required field.
    #[must_use]
    pub fn builder(protocol: Protocol) -> TransportBuilder {
        TransportBuilder {
            id: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol,
            serializations: BTreeSet::new(),
            topic: DEFAULT_TOPIC.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }

    /// The uniqueness key, or `None` for pub/sub protocols which may share endpoints.
    #[must_use]
    pub fn exclusive_endpoint(&self) -> Option<Endpoint> {
        (!self.protocol.pub_sub).then(|| self.endpoint())
    }

    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol.name.clone(),
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] when the host is empty or a
    /// field exceeds its length, or the port is 0.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost.into());
        }
        check_len("host", &self.host, HOST_MAX_LEN)?;
        if self.port == 0 {
            return Err(ValidationError::InvalidPort.into());
        }
        check_len("topic", &self.topic, TOPIC_MAX_LEN)?;
        check_len("channel", &self.channel, TOPIC_MAX_LEN)?;
        Ok(())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.endpoint().fmt(f)
    }
}

/// Step-by-step builder for [`Transport`].
#[derive(Debug)]
pub struct TransportBuilder {
    id: Option<TransportId>,
    host: String,
    port: u16,
    protocol: Protocol,
    serializations: BTreeSet<Serialization>,
    topic: String,
    channel: String,
}

impl TransportBuilder {
    #[must_use]
    pub fn id(mut self, id: TransportId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn serialization(mut self, serialization: Serialization) -> Self {
        self.serializations.insert(serialization);
        self
    }

    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Consume the builder, validate, and return a [`Transport`].
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Validation`] if a field is invalid.
    pub fn build(self) -> Result<Transport, InventoryError> {
        let transport = Transport {
            id: self.id.unwrap_or_default(),
            host: self.host,
            port: self.port,
            protocol: self.protocol,
            serializations: self.serializations,
            topic: self.topic,
            channel: self.channel,
        };
        transport.validate()?;
        Ok(transport)
    }
}
