//! Typed identifier newtypes backed by UUIDs, plus default display names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declares an inventory identifier: a random v4 UUID, printed and parsed in
/// its hyphenated form (the form stored in the database and in events).
macro_rules! inventory_id {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Identifier of ", $what, ".")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            #[doc = concat!("Allocate the identifier of a new ", $what, ".")]
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

inventory_id!(DeviceId, "a device");
inventory_id!(TransportId, "a transport endpoint");
inventory_id!(ActuatorId, "an actuator");
inventory_id!(EventId, "a published inventory change");

/// Generate a unique display name of the form `{prefix}-{uuid}`, cut to `max_len` characters.
#[must_use]
pub fn prefixed_name(prefix: &str, max_len: usize) -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{simple}").chars().take(max_len).collect()
}
