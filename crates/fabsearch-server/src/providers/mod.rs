//! Provider adapters
//!
//! Concrete upstream integrations registered at startup. Two retrieval
//! adapters (Sketchfab public API, token-gated Thingiverse) plus a family
//! of link-only providers for platforms without a usable public search
//! API.

mod link;
mod sketchfab;
mod thingiverse;

pub use link::{LinkAdapter, default_link_adapters};
pub use sketchfab::SketchfabAdapter;
pub use thingiverse::ThingiverseAdapter;

use std::sync::Arc;

use fabsearch_core::ProviderRegistry;

/// Favicon helper shared by the adapters.
pub(crate) fn favicon(domain: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={domain}&sz=64")
}

/// Build the full default registry from environment configuration.
pub fn default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(SketchfabAdapter::from_env()));
    registry.register(Arc::new(ThingiverseAdapter::from_env()));
    for adapter in default_link_adapters() {
        registry.register(adapter);
    }
    registry
}
