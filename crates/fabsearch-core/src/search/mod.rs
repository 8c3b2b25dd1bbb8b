//! Search Orchestration Module
//!
//! The top-level coordinator composing the whole pipeline per request:
//! intent parsing, cache lookup, provider selection, semaphore-gated
//! fan-out, ranking, faceting, response composition, and cache write.

mod engine;
mod types;

pub use engine::{EngineConfig, SearchEngine};
pub use types::{
    ProviderState, ProviderStatus, QuickLink, SearchError, SearchErrorEntry, SearchPayload,
    SearchRequest,
};
