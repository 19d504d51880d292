//! Fixed, in-process protocol and serialization catalog.

use std::collections::BTreeMap;

use orchestrator_domain::transport::{Protocol, Serialization};

use crate::ports::Catalog;

/// A catalog built once from a list of known protocols and serializations.
///
/// Lookups are case-sensitive, matching names as configured.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    protocols: BTreeMap<String, Protocol>,
    serializations: BTreeMap<String, Serialization>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(
        protocols: impl IntoIterator<Item = Protocol>,
        serializations: impl IntoIterator<Item = Serialization>,
    ) -> Self {
        Self {
            protocols: protocols
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
            serializations: serializations
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
        }
    }
}

impl Catalog for StaticCatalog {
    fn protocol(&self, name: &str) -> Option<Protocol> {
        self.protocols.get(name).cloned()
    }

    fn serialization(&self, name: &str) -> Option<Serialization> {
        self.serializations.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(
            [
                Protocol {
                    name: "HTTPS".to_string(),
                    pub_sub: false,
                },
                Protocol {
                    name: "MQTT".to_string(),
                    pub_sub: true,
                },
            ],
            [Serialization {
                name: "JSON".to_string(),
            }],
        )
    }

    #[test]
    fn should_resolve_known_protocol() {
        let protocol = catalog().protocol("MQTT").unwrap();
        assert!(protocol.pub_sub);
    }

    #[test]
    fn should_return_none_for_unknown_names() {
        let catalog = catalog();
        assert!(catalog.protocol("https").is_none());
        assert!(catalog.serialization("CBOR").is_none());
    }
}
