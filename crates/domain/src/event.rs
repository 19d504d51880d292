//! Changes — notifications emitted by a mutation inside its unit of work.
//!
//! Reactions (profile-group maintenance, cleanup) consume changes before the
//! unit commits; once committed, every change is published as an [`Event`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ActuatorId, DeviceId, EventId, TransportId};

/// Something that happened to the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    DeviceCreated {
        device: DeviceId,
    },
    DeviceUpdated {
        device: DeviceId,
    },
    DeviceDeleted {
        device: DeviceId,
    },
    TransportCreated {
        transport: TransportId,
    },
    TransportUpdated {
        transport: TransportId,
    },
    TransportAttached {
        device: DeviceId,
        transport: TransportId,
    },
    TransportDetached {
        device: DeviceId,
        transport: TransportId,
    },
    /// A transport was deleted because no device references it any more.
    TransportRemoved {
        transport: TransportId,
    },
    /// An actuator was created or its schema was written.
    ActuatorClassified {
        actuator: ActuatorId,
        profile: String,
    },
    /// An actuator was deleted; `profiles` are the groups it belonged to.
    ActuatorDeleted {
        actuator: ActuatorId,
        profiles: Vec<String>,
    },
    ProfileGroupCreated {
        profile: String,
    },
    ProfileMemberAdded {
        profile: String,
        actuator: ActuatorId,
    },
    ProfileMemberRemoved {
        profile: String,
        actuator: ActuatorId,
    },
    ProfileGroupRemoved {
        profile: String,
    },
}

/// A committed [`Change`], stamped for publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub change: Change,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Stamp a change with a fresh id and the current time.
    #[must_use]
    pub fn new(change: Change) -> Self {
        Self {
            id: EventId::new(),
            change,
            timestamp: Utc::now(),
        }
    }
}
