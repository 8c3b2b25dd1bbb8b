//! Suggestion Index
//!
//! Process-wide autocomplete state: a capped most-recent-first list of past
//! queries, a per-query summary of the top results observed for that query,
//! and a `source:id` item index backing result-detail lookups.
//!
//! All three stores are bounded with the same LRU discipline as the
//! response cache; nothing here grows without limit.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::Serialize;

use crate::rank::RankedResult;

/// Bounds for the suggestion stores.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionIndexConfig {
    /// Most recent queries kept (deduplicated).
    pub recent_cap: usize,
    /// Top-result summaries kept per query.
    pub summary_cap: usize,
    /// Distinct queries with summaries.
    pub query_map_cap: usize,
    /// Items addressable by `source:id`.
    pub item_index_cap: usize,
}

impl Default for SuggestionIndexConfig {
    fn default() -> Self {
        Self {
            recent_cap: 20,
            summary_cap: 8,
            query_map_cap: 256,
            item_index_cap: 2048,
        }
    }
}

/// Compact description of one top result for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub source: String,
}

/// A past query offered for completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

/// Grouped autocomplete response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestionGroups {
    pub popular: Vec<SuggestionItem>,
    pub recent: Vec<QuerySuggestion>,
    pub items: Vec<SuggestionItem>,
}

struct SuggestState {
    recent: VecDeque<String>,
    by_query: LruCache<String, Vec<SuggestionItem>>,
    items: LruCache<String, RankedResult>,
}

/// Process-wide suggestion state, shared across concurrent requests.
pub struct SuggestionIndex {
    config: SuggestionIndexConfig,
    state: Mutex<SuggestState>,
}

impl Default for SuggestionIndex {
    fn default() -> Self {
        Self::new(SuggestionIndexConfig::default())
    }
}

fn cap(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

impl SuggestionIndex {
    pub fn new(config: SuggestionIndexConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SuggestState {
                recent: VecDeque::new(),
                by_query: LruCache::new(cap(config.query_map_cap)),
                items: LruCache::new(cap(config.item_index_cap)),
            }),
        }
    }

    /// Record one completed search and its top results.
    pub fn remember(&self, query: &str, results: &[RankedResult]) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !state.recent.iter().any(|past| past == query) {
            state.recent.push_front(query.to_string());
            state.recent.truncate(self.config.recent_cap);
        }

        for ranked in results {
            let item = &ranked.result;
            state
                .items
                .put(format!("{}:{}", item.source, item.id), ranked.clone());
        }

        let summaries: Vec<SuggestionItem> = results
            .iter()
            .take(self.config.summary_cap)
            .map(|ranked| {
                let item = &ranked.result;
                SuggestionItem {
                    kind: item.asset_type.to_string(),
                    title: item.title.clone(),
                    thumbnail: item.thumbnail.clone(),
                    source: item
                        .source_label
                        .clone()
                        .unwrap_or_else(|| item.source.clone()),
                }
            })
            .collect();
        state.by_query.put(query.to_string(), summaries);
    }

    /// Grouped suggestions for a partial query: recent queries containing
    /// the partial, a popular slice of a matched query's top summaries, and
    /// a fallback drawn from any indexed query containing the partial.
    pub fn suggestions(&self, partial: &str) -> SuggestionGroups {
        let needle = partial.trim().to_lowercase();
        let exact_key = partial.trim();
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let recent: Vec<QuerySuggestion> = state
            .recent
            .iter()
            .filter(|query| query.to_lowercase().contains(&needle))
            .take(5)
            .map(|query| QuerySuggestion {
                kind: "query".to_string(),
                title: query.clone(),
            })
            .collect();

        let exact: Vec<SuggestionItem> = state
            .by_query
            .peek(exact_key)
            .cloned()
            .unwrap_or_default();
        let items = if exact.is_empty() {
            state
                .by_query
                .iter()
                .filter(|(query, _)| query.to_lowercase().contains(&needle))
                .flat_map(|(_, summaries)| summaries.iter().cloned())
                .take(5)
                .collect()
        } else {
            exact
        };
        let popular = items.iter().take(3).cloned().collect();

        SuggestionGroups {
            popular,
            recent,
            items,
        }
    }

    /// Point lookup for result-detail retrieval.
    pub fn item(&self, source: &str, id: &str) -> Option<RankedResult> {
        if source.is_empty() || id.is_empty() {
            return None;
        }
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.items.get(&format!("{source}:{id}")).cloned()
    }
}

impl std::fmt::Debug for SuggestionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
