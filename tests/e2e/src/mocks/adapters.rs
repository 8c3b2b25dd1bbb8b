//! Scripted adapters
//!
//! Each adapter answers with a fixed script (items, a verbatim payload for
//! contract-violation scenarios, or a failure) and counts how often it was
//! called, so tests can assert cache hits and circuit-breaker skips
//! precisely.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use fabsearch_core::{
    AdapterError, EngineConfig, ProviderDescriptor, ProviderQuery, ProviderRegistry,
    SearchAdapter, SearchEngine,
};

/// What a scripted adapter answers with.
pub enum ScriptedResponse {
    /// A well-formed array of raw result items.
    Items(Vec<Value>),
    /// A payload returned verbatim; use for contract violations.
    Payload(Value),
    /// A provider-level failure.
    Fail(String),
}

/// A provider adapter driven by a fixed script.
pub struct ScriptedAdapter {
    descriptor: ProviderDescriptor,
    response: ScriptedResponse,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(descriptor: ProviderDescriptor, response: ScriptedResponse) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            response,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Same as [`ScriptedAdapter::new`] but the call stalls first.
    pub fn slow(
        descriptor: ProviderDescriptor,
        response: ScriptedResponse,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            response,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    /// How many times the engine dispatched this adapter.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchAdapter for ScriptedAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn search(&self, _query: &ProviderQuery) -> Result<Value, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.response {
            ScriptedResponse::Items(items) => Ok(Value::Array(items.clone())),
            ScriptedResponse::Payload(payload) => Ok(payload.clone()),
            ScriptedResponse::Fail(message) => Err(AdapterError::Other(message.clone())),
        }
    }
}

/// A descriptor for a public, configured retrieval provider.
pub fn public_descriptor(id: &str, label: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        is_public: true,
        configured: true,
        ..ProviderDescriptor::api(id, label)
    }
}

/// Build an engine over the given adapters with the given config.
pub fn engine_for(adapters: Vec<Arc<dyn SearchAdapter>>, config: EngineConfig) -> SearchEngine {
    let mut registry = ProviderRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    SearchEngine::with_config(Arc::new(registry), config)
}
