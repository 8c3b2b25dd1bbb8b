//! # Fabsearch Core
//!
//! Federated search aggregation engine for maker/fabrication assets. One
//! user query fans out concurrently to a registry of independent upstream
//! providers and returns a single deduplicated, ranked, faceted result set
//! within a bounded time budget, even when some sources fail, time out,
//! or are deliberately disabled.
//!
//! The engine composes, per request:
//!
//! - **Query intent parsing**: `key:value` filter extraction plus synonym
//!   expansion of the plain query
//! - **Provider fan-out**: semaphore-gated concurrent adapter calls with
//!   per-call timeouts and per-provider circuit breaking
//! - **Normalization**: strict validation of heterogeneous raw payloads
//!   into one canonical schema
//! - **Ranking**: cross-provider duplicate merging and multi-mode ordering
//! - **Faceting**: source/license/format/price/recency counts and filters
//! - **Caching**: a short-lived TTL + capacity bounded response cache
//! - **Suggestions**: recent-query and top-result indexes for autocomplete
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fabsearch_core::{ProviderRegistry, SearchEngine, SearchRequest};
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register(my_adapter);
//!
//! let engine = SearchEngine::new(Arc::new(registry));
//! let payload = engine.execute(&SearchRequest::query("planetary gear")).await?;
//! println!("{} results", payload.count);
//! ```
//!
//! Partial failure is the normal case: provider-level errors, item-level
//! normalization errors and circuit-open skips are all isolated and
//! reported in the payload; only an empty query fails a request.

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod cache;
pub mod facet;
pub mod normalize;
pub mod provider;
pub mod query;
pub mod rank;
pub mod search;
pub mod suggest;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Canonical result schema
pub use normalize::{
    AssetType, EntityType, NormalizeError, NormalizedResult, ResultStats, normalize_payload,
    normalize_result,
};

// Provider boundary
pub use provider::{
    AdapterError, Capabilities, CircuitBreaker, CircuitBreakerConfig, MetricsRegistry,
    ProviderDescriptor, ProviderMetricsSnapshot, ProviderMode, ProviderQuery, ProviderRegistry,
    SearchAdapter,
};

// Query parsing
pub use query::{AdvancedQuery, QueryChip, QueryIntent, SynonymTable, parse_advanced};

// Ranking
pub use rank::{RankedResult, SortMode, SourceVariant, rank_and_dedupe};

// Facets
pub use facet::{FacetCounts, FacetFilters, PriceFacet, RecencyFacet, TabCounts, build_facets};

// Caching
pub use cache::TtlCache;

// Suggestions
pub use suggest::{
    QuerySuggestion, SuggestionGroups, SuggestionIndex, SuggestionIndexConfig, SuggestionItem,
};

// Orchestration
pub use search::{
    EngineConfig, ProviderState, ProviderStatus, QuickLink, SearchEngine, SearchError,
    SearchErrorEntry, SearchPayload, SearchRequest,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AdapterError, EngineConfig, NormalizedResult, ProviderDescriptor, ProviderMode,
        ProviderQuery, ProviderRegistry, RankedResult, SearchAdapter, SearchEngine, SearchError,
        SearchPayload, SearchRequest, SortMode,
    };
}
