//! Schema classification — derive an actuator's schema format and profile.
//!
//! An actuator schema is either a JADN document (only `meta` and `types` at the
//! top level, profile taken from `meta.title`) or a JSON schema (profile taken
//! from `title`). Anything that is not a JSON object falls back to the default
//! format with no profile.
//!
//! [`classify`] is the only place this logic lives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile assigned when a schema carries no usable title.
pub const NO_PROFILE: &str = "None";

const JADN_KEYS: [&str; 2] = ["meta", "types"];

/// Format of an actuator schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    #[default]
    Jadn,
    Json,
}

impl SchemaFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jadn => "jadn",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown schema format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema format {0:?}")]
pub struct UnknownSchemaFormat(pub String);

impl FromStr for SchemaFormat {
    type Err = UnknownSchemaFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jadn" => Ok(Self::Jadn),
            "json" => Ok(Self::Json),
            _ => Err(UnknownSchemaFormat(s.to_string())),
        }
    }
}

/// Shape of a schema payload, inspected before looking at keys.
#[derive(Debug, Clone, Copy)]
pub enum SchemaDocument<'a> {
    Mapping(&'a Map<String, Value>),
    Other(&'a Value),
}

impl<'a> From<&'a Value> for SchemaDocument<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            other => Self::Other(other),
        }
    }
}

impl SchemaDocument<'_> {
    /// A non-mapping payload is stored as-is but cannot be classified.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub format: SchemaFormat,
    /// Normalized profile: spaces replaced by underscores, never empty.
    pub profile: String,
}

/// Derive the format and profile of `schema`.
#[must_use]
pub fn classify(schema: &Value) -> Classification {
    match SchemaDocument::from(schema) {
        SchemaDocument::Other(_) => Classification {
            format: SchemaFormat::default(),
            profile: NO_PROFILE.to_string(),
        },
        SchemaDocument::Mapping(map) if map.keys().all(|k| JADN_KEYS.contains(&k.as_str())) => {
            let title = map
                .get("meta")
                .and_then(Value::as_object)
                .and_then(|meta| meta.get("title"))
                .and_then(Value::as_str);
            Classification {
                format: SchemaFormat::Jadn,
                profile: normalize_profile(title),
            }
        }
        SchemaDocument::Mapping(map) => Classification {
            format: SchemaFormat::Json,
            profile: normalize_profile(map.get("title").and_then(Value::as_str)),
        },
    }
}

fn normalize_profile(title: Option<&str>) -> String {
    let profile = title.unwrap_or_default().replace(' ', "_");
    if profile.trim().is_empty() {
        NO_PROFILE.to_string()
    } else {
        profile
    }
}

/// Profile group name for a normalized profile (underscores back to spaces).
#[must_use]
pub fn display_profile(profile: &str) -> String {
    profile.replace('_', " ")
}
