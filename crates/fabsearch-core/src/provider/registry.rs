//! Provider registry
//!
//! The process-wide set of registered adapters. Built once at startup;
//! descriptors are immutable afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ProviderDescriptor, SearchAdapter};

/// Registered adapters keyed by provider id.
///
/// A `BTreeMap` keeps iteration (and therefore default provider selection
/// and wire output) deterministic.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SearchAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its descriptor id. Re-registering an id
    /// replaces the previous adapter.
    pub fn register(&mut self, adapter: Arc<dyn SearchAdapter>) {
        let id = adapter.descriptor().id.clone();
        self.providers.insert(id, adapter);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SearchAdapter>> {
        self.providers.get(id).cloned()
    }

    /// All registered provider ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// All descriptors, sorted by id.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .values()
            .map(|adapter| adapter.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
