//! Request and response payload types for the search pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facet::{FacetCounts, TabCounts};
use crate::normalize::AssetType;
use crate::provider::{Capabilities, ProviderMode};
use crate::query::{QueryChip, QueryIntent};
use crate::rank::{RankedResult, SortMode};

/// One search request as received at the boundary. Limits and page numbers
/// are clamped by the engine regardless of client input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// Raw query text.
    pub q: String,
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub tab: Option<String>,
    /// Comma-separated provider ids; all registered providers when absent.
    pub sources: Option<String>,
    pub license: Option<String>,
    pub format: Option<String>,
    pub price: Option<String>,
    /// Time-window token, e.g. `30d`.
    pub time_range: Option<String>,
}

impl SearchRequest {
    /// Convenience constructor for a plain query.
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Self::default()
        }
    }
}

/// The only request-level failure: everything else degrades gracefully.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("missing query")]
    EmptyQuery,
}

/// One recorded provider- or item-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchErrorEntry {
    /// Provider id the error is attributed to.
    pub source: String,
    pub message: String,
}

/// Health summary shown per selected provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    Ok,
    Warn,
    Error,
    Link,
}

/// Per-provider status line in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    /// Display label.
    pub source: String,
    pub id: String,
    pub mode: ProviderMode,
    pub state: ProviderState,
    pub supports: Capabilities,
    pub asset_types: Vec<AssetType>,
}

/// Deep-link to a provider's own search page for the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLink {
    pub source: String,
    pub label: String,
    pub icon_url: Option<String>,
    pub kind: ProviderMode,
    pub asset_types: Vec<AssetType>,
    pub url: String,
}

/// The complete response payload for one search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub query: String,
    pub expanded_query: String,
    pub intent: QueryIntent,
    pub query_chips: Vec<QueryChip>,
    pub page: u32,
    pub limit: u32,
    pub sort: SortMode,
    pub tab: String,
    /// Providers actually dispatched for retrieval.
    pub sources: Vec<String>,
    /// Link-only providers contributing deep-links.
    pub links: Vec<String>,
    pub count: usize,
    pub results: Vec<RankedResult>,
    pub link_results: Vec<RankedResult>,
    pub quick_links: Vec<QuickLink>,
    pub facets: FacetCounts,
    pub errors: Vec<SearchErrorEntry>,
    pub provider_status: Vec<ProviderStatus>,
    pub tab_counts: TabCounts,
    pub cached: bool,
    pub took_ms: u64,
}
