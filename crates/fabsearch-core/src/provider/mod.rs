//! Provider Module
//!
//! The boundary to upstream data sources:
//! - [`ProviderDescriptor`]: immutable per-provider identity and capabilities
//! - [`SearchAdapter`]: the async adapter contract (raw, unvalidated payloads)
//! - [`ProviderRegistry`]: the process-wide set of registered adapters
//! - [`CircuitBreaker`]: per-provider failure counting with cooldown
//! - [`MetricsRegistry`]: rolling latency/error metrics (observability only)

mod descriptor;
mod health;
mod metrics;
mod registry;

pub use descriptor::{Capabilities, ProviderDescriptor, ProviderMode};
pub use health::{CircuitBreaker, CircuitBreakerConfig};
pub use metrics::{MetricsRegistry, ProviderMetricsSnapshot};
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure while calling one provider adapter.
///
/// Adapter errors are isolated per provider: they are recorded in the
/// response error list and never fail the overall request.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("request failed: {0}")]
    Http(String),
    /// Upstream returned a non-success status.
    #[error("provider returned status {0}")]
    Status(u16),
    /// The adapter's own deadline elapsed.
    #[error("timed out after {0} ms")]
    Timeout(u64),
    /// Anything else the adapter wants to surface.
    #[error("{0}")]
    Other(String),
}

/// The search intent handed to one adapter call.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    /// Synonym-expanded query text.
    pub query: String,
    /// Clamped result limit.
    pub limit: u32,
    /// Clamped page number.
    pub page: u32,
    /// Canonical sort mode name.
    pub sort: String,
    /// Normalized tab name.
    pub tab: String,
}

/// A pluggable upstream data source.
///
/// Adapters return *raw* result candidates: an array of untyped JSON
/// objects. Validation and canonicalization happen in the core, not here.
/// An adapter with no matches is expected to resolve with an empty array
/// rather than fail; link-only adapters always return an empty array and
/// exist solely to contribute a deep-link.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Static descriptor fields for this provider.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Perform one retrieval call. Must resolve or fail within the
    /// adapter's own deadline; the engine enforces an outer timeout as well.
    async fn search(&self, query: &ProviderQuery) -> Result<Value, AdapterError>;
}
