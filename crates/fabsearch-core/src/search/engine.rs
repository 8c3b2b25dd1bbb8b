//! Search Orchestrator
//!
//! Per-request state machine: Parse → CacheLookup → SelectProviders →
//! Dispatch → Rank → Facet → Compose → Cache write → Return.
//!
//! Fan-out is a join over independent tasks gated by a semaphore; no task
//! outcome ever short-circuits its siblings. Provider-level failures and
//! item-level normalization failures are recorded and isolated. Only an
//! empty query fails the request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::facet::{
    FacetFilters, apply_facet_filters, build_facets, canonical_tab, count_tabs, matches_tab,
};
use crate::normalize::{NormalizedResult, normalize_payload, normalize_result};
use crate::provider::{
    AdapterError, CircuitBreaker, CircuitBreakerConfig, MetricsRegistry, ProviderDescriptor,
    ProviderMetricsSnapshot, ProviderMode, ProviderQuery, ProviderRegistry, SearchAdapter,
};
use crate::query::{QueryChip, QueryIntent, SynonymTable, parse_advanced};
use crate::rank::{RankedResult, SortMode, rank_and_dedupe};
use crate::suggest::{SuggestionGroups, SuggestionIndex, SuggestionIndexConfig};

use super::types::{
    ProviderState, ProviderStatus, QuickLink, SearchError, SearchErrorEntry, SearchPayload,
    SearchRequest,
};

/// Percent-encoding set matching what browsers expect inside a query
/// parameter: everything but unreserved characters.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tuning knobs for one engine instance. Every shared store is sized here
/// so tests can construct isolated engines with tiny windows.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Simultaneous in-flight provider calls per engine.
    pub max_concurrency: usize,
    /// Outer deadline for one provider call.
    pub provider_timeout: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    /// Result limit applied when the request does not carry one.
    pub default_limit: u32,
    pub breaker: CircuitBreakerConfig,
    pub suggestions: SuggestionIndexConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            provider_timeout: Duration::from_secs(8),
            cache_capacity: 500,
            cache_ttl: Duration::from_secs(30),
            default_limit: 24,
            breaker: CircuitBreakerConfig::default(),
            suggestions: SuggestionIndexConfig::default(),
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// The aggregation engine: one per process, shared across requests.
///
/// All mutable state (circuit breaker, metrics, suggestion index, response
/// cache) lives inside the engine as injected, mutex-guarded services
/// rather than ambient globals, so tests construct engines with isolated
/// state.
pub struct SearchEngine {
    registry: Arc<ProviderRegistry>,
    synonyms: SynonymTable,
    breaker: CircuitBreaker,
    metrics: MetricsRegistry,
    cache: TtlCache<String, SearchPayload>,
    suggestions: SuggestionIndex,
    limiter: Arc<Semaphore>,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<ProviderRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            synonyms: SynonymTable::default(),
            breaker: CircuitBreaker::new(config.breaker),
            metrics: MetricsRegistry::new(),
            cache: TtlCache::new(config.cache_capacity, config.cache_ttl),
            suggestions: SuggestionIndex::new(config.suggestions),
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            config,
        }
    }

    /// Replace the synonym table (defaults to the built-in vocabulary).
    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Circuit breaker, exposed for observability surfaces.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Current per-provider metrics.
    pub fn metrics(&self) -> Vec<ProviderMetricsSnapshot> {
        self.metrics.snapshot()
    }

    /// Grouped autocomplete suggestions for a partial query.
    pub fn suggestions(&self, partial: &str) -> SuggestionGroups {
        self.suggestions.suggestions(partial)
    }

    /// Point lookup into the item index populated by past responses.
    pub fn item(&self, source: &str, id: &str) -> Option<RankedResult> {
        self.suggestions.item(source, id)
    }

    /// Run one search request through the full pipeline.
    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchPayload, SearchError> {
        let started = Instant::now();
        let raw_query = request.q.trim();
        if raw_query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        // -- Parse --------------------------------------------------------
        let advanced = parse_advanced(raw_query);
        let query = if advanced.query_text.is_empty() {
            raw_query.to_string()
        } else {
            advanced.query_text.clone()
        };
        let intent = QueryIntent::parse(&query, &self.synonyms);

        let limit = clamp_number(request.limit, self.config.default_limit, 1, 100);
        let page = clamp_number(request.page, 1, 1, 20);
        let sort = SortMode::parse(request.sort.as_deref().unwrap_or(""));
        let tab = canonical_tab(
            advanced
                .type_hint
                .as_deref()
                .or(request.tab.as_deref())
                .unwrap_or("models"),
        );

        // -- Select providers ---------------------------------------------
        let requested = self.requested_ids(request, &advanced.source);
        let selected: Vec<Arc<dyn SearchAdapter>> = requested
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();
        let link_ids: Vec<String> = selected
            .iter()
            .filter(|adapter| adapter.descriptor().mode == ProviderMode::Link)
            .map(|adapter| adapter.descriptor().id.clone())
            .collect();
        let api_adapters: Vec<Arc<dyn SearchAdapter>> = selected
            .iter()
            .filter(|adapter| {
                let descriptor = adapter.descriptor();
                descriptor.eligible() && !self.breaker.should_skip(&descriptor.id)
            })
            .cloned()
            .collect();
        let api_ids: Vec<String> = api_adapters
            .iter()
            .map(|adapter| adapter.descriptor().id.clone())
            .collect();

        let quick_links: Vec<QuickLink> = selected
            .iter()
            .filter_map(|adapter| {
                let descriptor = adapter.descriptor();
                descriptor.search_url_template.as_ref().map(|template| QuickLink {
                    source: descriptor.id.clone(),
                    label: descriptor.label.clone(),
                    icon_url: descriptor.icon_url.clone(),
                    kind: descriptor.mode,
                    asset_types: descriptor.asset_types.clone(),
                    url: build_search_url(template, &query),
                })
            })
            .collect();

        let filters = FacetFilters {
            license: effective_filter(advanced.license.as_deref(), request.license.as_deref()),
            format: effective_filter(advanced.format.as_deref(), request.format.as_deref()),
            price: effective_filter(advanced.price.as_deref(), request.price.as_deref()),
            time_range: effective_filter(None, request.time_range.as_deref()),
        };

        // -- Cache lookup -------------------------------------------------
        let cache_key = cache_signature(
            &query, limit, page, sort, &tab, &intent, &advanced.chips, &api_ids, &filters,
        );
        if let Some(mut payload) = self.cache.get(&cache_key) {
            debug!(query = %query, "serving cached search payload");
            payload.quick_links = quick_links;
            payload.cached = true;
            payload.took_ms = elapsed_ms(started);
            return Ok(payload);
        }

        // -- Dispatch -----------------------------------------------------
        debug!(
            query = %query,
            providers = api_adapters.len(),
            links = link_ids.len(),
            "dispatching provider fan-out"
        );
        let (results, errors) = self
            .dispatch(&api_adapters, &intent, limit, page, sort, &tab)
            .await;

        // -- Rank, facet, compose -----------------------------------------
        let now = Utc::now();
        let ranked_all = rank_and_dedupe(results, sort, now);
        let faceted_all = apply_facet_filters(ranked_all.clone(), &filters, now);
        let final_results: Vec<RankedResult> = faceted_all
            .iter()
            .filter(|ranked| matches_tab(&ranked.result, &tab))
            .take(limit as usize)
            .cloned()
            .collect();

        let all_link_results = build_link_results(&quick_links, &query);
        let link_results: Vec<RankedResult> = all_link_results
            .iter()
            .filter(|ranked| matches_tab(&ranked.result, &tab))
            .cloned()
            .collect();

        let error_sources: HashSet<&str> =
            errors.iter().map(|entry| entry.source.as_str()).collect();
        let provider_status: Vec<ProviderStatus> = selected
            .iter()
            .map(|adapter| {
                let descriptor = adapter.descriptor();
                ProviderStatus {
                    source: descriptor.label.clone(),
                    id: descriptor.id.clone(),
                    mode: descriptor.mode,
                    state: provider_state(descriptor, &error_sources),
                    supports: descriptor.supports,
                    asset_types: descriptor.asset_types.clone(),
                }
            })
            .collect();

        let mut facet_input = faceted_all;
        facet_input.extend(link_results.iter().cloned());
        let facets = build_facets(&facet_input, now);
        let tab_counts = count_tabs(
            ranked_all
                .iter()
                .chain(all_link_results.iter())
                .map(|ranked| &ranked.result),
        );

        let mut remembered = final_results.clone();
        remembered.extend(link_results.iter().cloned());
        self.suggestions.remember(&query, &remembered);

        let payload = SearchPayload {
            query,
            expanded_query: intent.expanded_query.clone(),
            intent,
            query_chips: advanced.chips,
            page,
            limit,
            sort,
            tab,
            sources: api_ids,
            links: link_ids,
            count: final_results.len(),
            results: final_results,
            link_results,
            quick_links,
            facets,
            errors,
            provider_status,
            tab_counts,
            cached: false,
            took_ms: elapsed_ms(started),
        };
        self.cache.insert(cache_key, payload.clone());
        Ok(payload)
    }

    /// Requested provider ids: the CSV parameter (or every registered id),
    /// extended with `source:` query tokens, deduplicated in order.
    fn requested_ids(&self, request: &SearchRequest, advanced_sources: &[String]) -> Vec<String> {
        let base: Vec<String> = match request.sources.as_deref() {
            Some(csv) if !csv.trim().is_empty() => parse_csv(csv),
            _ => self.registry.ids(),
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut requested = Vec::new();
        for id in base.into_iter().chain(advanced_sources.iter().cloned()) {
            if seen.insert(id.clone()) {
                requested.push(id);
            }
        }
        requested
    }

    /// Fan the expanded query out to every eligible adapter, one task per
    /// provider through the admission gate. Each task's outcome is captured
    /// individually; a failure never cancels siblings.
    async fn dispatch(
        &self,
        adapters: &[Arc<dyn SearchAdapter>],
        intent: &QueryIntent,
        limit: u32,
        page: u32,
        sort: SortMode,
        tab: &str,
    ) -> (Vec<NormalizedResult>, Vec<SearchErrorEntry>) {
        let mut join: JoinSet<ProviderOutcome> = JoinSet::new();
        for adapter in adapters {
            let adapter = Arc::clone(adapter);
            let limiter = Arc::clone(&self.limiter);
            let timeout = self.config.provider_timeout;
            let provider_query = ProviderQuery {
                query: intent.expanded_query.clone(),
                limit,
                page,
                sort: sort.to_string(),
                tab: tab.to_string(),
            };
            join.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                let call_started = Instant::now();
                let outcome =
                    tokio::time::timeout(timeout, adapter.search(&provider_query)).await;
                let elapsed_ms = call_started.elapsed().as_millis() as u64;
                let payload = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(error)) => Err(error.to_string()),
                    Err(_) => {
                        Err(AdapterError::Timeout(timeout.as_millis() as u64).to_string())
                    }
                };
                ProviderOutcome {
                    provider_id: adapter.descriptor().id.clone(),
                    payload,
                    elapsed_ms,
                }
            });
        }

        let mut results: Vec<NormalizedResult> = Vec::new();
        let mut errors: Vec<SearchErrorEntry> = Vec::new();
        while let Some(joined) = join.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(error = %error, "provider task failed to join");
                    continue;
                }
            };
            match outcome.payload.and_then(|value| {
                normalize_payload(value).map_err(|error| error.to_string())
            }) {
                Ok(raw_items) => {
                    for raw in &raw_items {
                        match normalize_result(raw) {
                            Ok(mut item) => {
                                self.enrich(&mut item);
                                apply_intent_boost(&mut item, intent);
                                results.push(item);
                            }
                            Err(error) => errors.push(SearchErrorEntry {
                                source: outcome.provider_id.clone(),
                                message: error.to_string(),
                            }),
                        }
                    }
                    self.breaker.record_outcome(&outcome.provider_id, true);
                    self.metrics
                        .record_latency(&outcome.provider_id, outcome.elapsed_ms, true);
                }
                Err(message) => {
                    warn!(provider = %outcome.provider_id, error = %message, "provider call failed");
                    errors.push(SearchErrorEntry {
                        source: outcome.provider_id.clone(),
                        message,
                    });
                    self.breaker.record_outcome(&outcome.provider_id, false);
                    self.metrics
                        .record_latency(&outcome.provider_id, outcome.elapsed_ms, false);
                }
            }
        }
        (results, errors)
    }

    /// Fill in display label and icon from the provider's descriptor.
    fn enrich(&self, item: &mut NormalizedResult) {
        if item.source_label.is_some() && item.source_icon_url.is_some() {
            return;
        }
        if let Some(adapter) = self.registry.get(&item.source) {
            let descriptor = adapter.descriptor();
            if item.source_label.is_none() {
                item.source_label = Some(descriptor.label.clone());
            }
            if item.source_icon_url.is_none() {
                item.source_icon_url = descriptor.icon_url.clone();
            }
        }
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("providers", &self.registry.ids())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

struct ProviderOutcome {
    provider_id: String,
    payload: Result<Value, String>,
    elapsed_ms: u64,
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn clamp_number(value: Option<u32>, fallback: u32, min: u32, max: u32) -> u32 {
    value.unwrap_or(fallback).clamp(min, max)
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Advanced-token value wins over the request parameter; empty collapses
/// to none.
fn effective_filter(advanced: Option<&str>, requested: Option<&str>) -> Option<String> {
    advanced
        .or(requested)
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

/// Substitute the encoded query into a provider's `{q}` template.
fn build_search_url(template: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query, QUERY_ENCODE_SET).to_string();
    template.replace("{q}", &encoded)
}

fn provider_state(descriptor: &ProviderDescriptor, error_sources: &HashSet<&str>) -> ProviderState {
    if descriptor.mode == ProviderMode::Link {
        ProviderState::Link
    } else if error_sources.contains(descriptor.id.as_str()) {
        ProviderState::Error
    } else if descriptor.configured || descriptor.is_public {
        ProviderState::Ok
    } else {
        ProviderState::Warn
    }
}

/// Relevance boosts from intent matches: token in title, format overlap,
/// license hint, free when the query asked for free.
fn apply_intent_boost(item: &mut NormalizedResult, intent: &QueryIntent) {
    let title = item.title.to_lowercase();
    let mut boost = 0.0;
    if intent.tokens.iter().any(|token| title.contains(token)) {
        boost += 4.0;
    }
    if !intent.formats.is_empty()
        && intent.formats.iter().any(|format| {
            item.formats
                .iter()
                .any(|candidate| candidate.to_lowercase() == *format)
        })
    {
        boost += 5.0;
    }
    if let Some(hint) = &intent.license_hint {
        if item
            .license
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .contains(hint)
        {
            boost += 3.0;
        }
    }
    if intent.free_only && item.price == Some(0.0) {
        boost += 3.0;
    }
    item.score += boost;
}

/// Synthesize "Search on X" pseudo-results for link-only providers. The
/// synthesized records go through the same normalizer as provider results,
/// so every invariant holds for them too.
fn build_link_results(quick_links: &[QuickLink], query: &str) -> Vec<RankedResult> {
    quick_links
        .iter()
        .filter(|link| link.kind == ProviderMode::Link)
        .filter_map(|link| {
            let asset_type = link
                .asset_types
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "model3d".to_string());
            let raw = json!({
                "source": link.source,
                "sourceLabel": link.label,
                "sourceIconUrl": link.icon_url,
                "assetType": asset_type,
                "title": format!("Search “{query}” on {}", link.label),
                "creatorName": "Direct platform search",
                "url": link.url,
                "thumbnail": link.icon_url,
                "meta": { "tags": ["external-search"] },
            });
            normalize_result(&raw).ok().map(RankedResult::from)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn cache_signature(
    query: &str,
    limit: u32,
    page: u32,
    sort: SortMode,
    tab: &str,
    intent: &QueryIntent,
    chips: &[QueryChip],
    sources: &[String],
    filters: &FacetFilters,
) -> String {
    #[derive(Serialize)]
    struct Signature<'a> {
        q: &'a str,
        limit: u32,
        page: u32,
        sort: SortMode,
        tab: &'a str,
        intent: &'a QueryIntent,
        chips: &'a [QueryChip],
        sources: &'a [String],
        filters: &'a FacetFilters,
    }
    serde_json::to_string(&Signature {
        q: query,
        limit,
        page,
        sort,
        tab,
        intent,
        chips,
        sources,
        filters,
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticAdapter {
        descriptor: ProviderDescriptor,
        payload: Value,
    }

    #[async_trait]
    impl SearchAdapter for StaticAdapter {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn search(&self, _query: &ProviderQuery) -> Result<Value, AdapterError> {
            Ok(self.payload.clone())
        }
    }

    fn public_descriptor(id: &str, label: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            is_public: true,
            configured: true,
            ..ProviderDescriptor::api(id, label)
        }
    }

    fn engine_with(adapters: Vec<Arc<dyn SearchAdapter>>) -> SearchEngine {
        let mut registry = ProviderRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        SearchEngine::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_upfront() {
        let engine = engine_with(vec![]);
        let error = engine
            .execute(&SearchRequest::query("   "))
            .await
            .unwrap_err();
        assert_eq!(error, SearchError::EmptyQuery);
    }

    #[tokio::test]
    async fn test_link_providers_contribute_pseudo_results() {
        let mut descriptor = ProviderDescriptor::link("printables", "Printables");
        descriptor.search_url_template =
            Some("https://example.com/search?q={q}".to_string());
        let engine = engine_with(vec![Arc::new(StaticAdapter {
            descriptor,
            payload: json!([]),
        })]);

        let payload = engine
            .execute(&SearchRequest::query("gear"))
            .await
            .unwrap();

        assert!(payload.results.is_empty());
        assert_eq!(payload.link_results.len(), 1);
        assert!(payload.link_results[0].result.title.contains("gear"));
        assert_eq!(payload.links, vec!["printables"]);
        assert!(payload.sources.is_empty());
    }

    #[tokio::test]
    async fn test_quick_link_encodes_query() {
        let mut descriptor = ProviderDescriptor::link("thangs", "Thangs");
        descriptor.search_url_template = Some("https://example.com/s?q={q}".to_string());
        let engine = engine_with(vec![Arc::new(StaticAdapter {
            descriptor,
            payload: json!([]),
        })]);

        let payload = engine
            .execute(&SearchRequest::query("gift box"))
            .await
            .unwrap();

        assert_eq!(
            payload.quick_links[0].url,
            "https://example.com/s?q=gift%20box"
        );
    }

    #[tokio::test]
    async fn test_limit_and_page_are_clamped() {
        let engine = engine_with(vec![Arc::new(StaticAdapter {
            descriptor: public_descriptor("p", "P"),
            payload: json!([]),
        })]);

        let payload = engine
            .execute(&SearchRequest {
                q: "gear".to_string(),
                limit: Some(10_000),
                page: Some(0),
                ..SearchRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(payload.limit, 100);
        assert_eq!(payload.page, 1);
    }

    #[tokio::test]
    async fn test_source_tokens_extend_requested_providers() {
        let adapter = Arc::new(StaticAdapter {
            descriptor: public_descriptor("sketchfab", "Sketchfab"),
            payload: json!([{
                "source": "sketchfab",
                "id": "s1",
                "title": "Laser Gear",
                "url": "https://sketchfab.example/s1",
            }]),
        });
        let engine = engine_with(vec![adapter]);

        let payload = engine
            .execute(&SearchRequest {
                q: "source:sketchfab gear".to_string(),
                sources: Some("nonexistent".to_string()),
                ..SearchRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(payload.sources, vec!["sketchfab"]);
        assert_eq!(payload.results.len(), 1);
    }

    #[tokio::test]
    async fn test_intent_boost_raises_score() {
        let adapter = Arc::new(StaticAdapter {
            descriptor: public_descriptor("p", "P"),
            payload: json!([
                {
                    "source": "p",
                    "id": "match",
                    "title": "Gear Holder",
                    "url": "https://p.example/match",
                },
                {
                    "source": "p",
                    "id": "other",
                    "title": "Unrelated",
                    "url": "https://p.example/other",
                },
            ]),
        });
        let engine = engine_with(vec![adapter]);

        let payload = engine
            .execute(&SearchRequest::query("gear"))
            .await
            .unwrap();

        assert_eq!(payload.results[0].result.id, "match");
        assert!(payload.results[0].result.score > payload.results[1].result.score);
    }

    #[tokio::test]
    async fn test_unconfigured_private_provider_reports_warn() {
        let engine = engine_with(vec![Arc::new(StaticAdapter {
            descriptor: ProviderDescriptor::api("private", "Private"),
            payload: json!([]),
        })]);

        let payload = engine
            .execute(&SearchRequest::query("gear"))
            .await
            .unwrap();

        assert!(payload.sources.is_empty());
        assert_eq!(payload.provider_status[0].state, ProviderState::Warn);
        assert!(payload.errors.is_empty());
    }
}
