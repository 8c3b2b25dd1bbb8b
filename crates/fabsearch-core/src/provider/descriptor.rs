//! Provider descriptors
//!
//! One immutable descriptor per provider for the process lifetime,
//! registered at startup.

use serde::{Deserialize, Serialize};

use crate::normalize::AssetType;

/// How a provider participates in a search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Performs retrieval and contributes result candidates.
    #[default]
    Api,
    /// Contributes only a deep-link to its own search page.
    Link,
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Api => write!(f, "api"),
            ProviderMode::Link => write!(f, "link"),
        }
    }
}

/// Declared capability flags for a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub search: bool,
    pub stats: bool,
    pub license: bool,
    pub formats: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            search: true,
            stats: false,
            license: false,
            formats: false,
        }
    }
}

/// Immutable identity and capability record for one provider.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Stable identifier, unique within the registry.
    pub id: String,
    /// Human-readable display label.
    pub label: String,
    pub mode: ProviderMode,
    pub homepage: Option<String>,
    /// Deep-link template with a `{q}` placeholder for the encoded query.
    pub search_url_template: Option<String>,
    pub icon_url: Option<String>,
    pub asset_types: Vec<AssetType>,
    pub supports: Capabilities,
    /// Whether the adapter has everything it needs (tokens, endpoints).
    pub configured: bool,
    /// Usable without credentials.
    pub is_public: bool,
    /// Free-text operator notes surfaced by the sources endpoint.
    pub notes: String,
}

impl ProviderDescriptor {
    /// Descriptor for a retrieval provider.
    pub fn api(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            mode: ProviderMode::Api,
            homepage: None,
            search_url_template: None,
            icon_url: None,
            asset_types: vec![AssetType::Model3d],
            supports: Capabilities::default(),
            configured: false,
            is_public: false,
            notes: String::new(),
        }
    }

    /// Descriptor for a link-only provider. Link providers are always
    /// considered configured; there is nothing to configure.
    pub fn link(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            mode: ProviderMode::Link,
            configured: true,
            is_public: true,
            ..Self::api(id, label)
        }
    }

    /// Whether this provider may be dispatched for retrieval.
    pub fn eligible(&self) -> bool {
        self.mode == ProviderMode::Api && (self.configured || self.is_public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_descriptors_are_configured() {
        let descriptor = ProviderDescriptor::link("printables", "Printables");

        assert_eq!(descriptor.mode, ProviderMode::Link);
        assert!(descriptor.configured);
        assert!(!descriptor.eligible());
    }

    #[test]
    fn test_api_descriptor_eligibility() {
        let mut descriptor = ProviderDescriptor::api("sketchfab", "Sketchfab");
        assert!(!descriptor.eligible());

        descriptor.is_public = true;
        assert!(descriptor.eligible());
    }
}
