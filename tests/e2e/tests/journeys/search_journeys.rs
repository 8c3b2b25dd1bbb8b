//! Complete search workflow validation: cross-provider merging, graceful
//! degradation, link synthesis, advanced queries, and facet invariants.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use fabsearch_core::{
    EngineConfig, ProviderDescriptor, ProviderState, SearchAdapter, SearchRequest,
};
use fabsearch_e2e_tests::mocks::{
    ScriptedAdapter, ScriptedResponse, engine_for, public_descriptor,
};

#[tokio::test]
async fn merges_ranks_dedupes_across_adapters_and_degrades_gracefully() {
    let sketchfab = ScriptedAdapter::new(
        public_descriptor("sketchfab", "Sketchfab"),
        ScriptedResponse::Items(vec![json!({
            "source": "sketchfab",
            "id": "s1",
            "title": "Planetary Gear",
            "url": "https://sketchfab.example/s1",
            "creatorName": "Alice",
            "meta": { "likes": 20, "downloads": 10 },
            "score": 120,
        })]),
    );
    let thingiverse = ScriptedAdapter::new(
        public_descriptor("thingiverse", "Thingiverse"),
        ScriptedResponse::Items(vec![
            json!({
                "source": "thingiverse",
                "id": "t1",
                "title": "Planetary Gear",
                "url": "https://thingiverse.example/t1",
                "creatorName": "Alice",
                "meta": { "likes": 7, "downloads": 2 },
                "score": 90,
            }),
            json!({
                "source": "thingiverse",
                "id": "t2",
                "title": "Clamp",
                "url": "https://thingiverse.example/t2",
                "creatorName": "Bob",
                "meta": { "likes": 2 },
                "score": 30,
            }),
        ]),
    );
    let broken = ScriptedAdapter::new(
        public_descriptor("broken", "Broken"),
        ScriptedResponse::Fail("timeout while requesting provider".to_string()),
    );
    let malformed = ScriptedAdapter::new(
        public_descriptor("malformed", "Malformed"),
        ScriptedResponse::Payload(json!({ "bad": true })),
    );
    let private = ScriptedAdapter::new(
        ProviderDescriptor::api("private", "Private Disabled"),
        ScriptedResponse::Fail("should not execute".to_string()),
    );

    let engine = engine_for(
        vec![
            sketchfab.clone() as Arc<dyn SearchAdapter>,
            thingiverse.clone() as Arc<dyn SearchAdapter>,
            broken.clone() as Arc<dyn SearchAdapter>,
            malformed.clone() as Arc<dyn SearchAdapter>,
            private.clone() as Arc<dyn SearchAdapter>,
        ],
        EngineConfig::default(),
    );

    let payload = engine
        .execute(&SearchRequest {
            q: "planetary".to_string(),
            sources: Some("sketchfab,thingiverse,broken,malformed,private".to_string()),
            sort: Some("relevant".to_string()),
            limit: Some(10),
            ..SearchRequest::default()
        })
        .await
        .unwrap();

    assert_eq!(payload.results.len(), 2);

    let merged = &payload.results[0];
    assert_eq!(merged.result.title, "Planetary Gear");
    let mut found = merged.also_found_on.clone();
    found.sort();
    assert_eq!(found, vec!["sketchfab", "thingiverse"]);
    assert_eq!(merged.result.source, "sketchfab");
    assert_eq!(merged.result.stats.likes, Some(20.0));
    assert_eq!(merged.result.stats.downloads, Some(10.0));
    assert_eq!(merged.source_variants.len(), 2);

    let mut error_sources: Vec<&str> = payload
        .errors
        .iter()
        .map(|entry| entry.source.as_str())
        .collect();
    error_sources.sort();
    assert_eq!(error_sources, vec!["broken", "malformed"]);

    let state_of = |id: &str| {
        payload
            .provider_status
            .iter()
            .find(|status| status.id == id)
            .map(|status| status.state)
            .unwrap()
    };
    assert_eq!(state_of("sketchfab"), ProviderState::Ok);
    assert_eq!(state_of("thingiverse"), ProviderState::Ok);
    assert_eq!(state_of("broken"), ProviderState::Error);
    assert_eq!(state_of("malformed"), ProviderState::Error);
    assert_eq!(state_of("private"), ProviderState::Warn);

    // The unconfigured private provider is never dispatched.
    assert_eq!(private.calls(), 0);
    assert_eq!(sketchfab.calls(), 1);
}

#[tokio::test]
async fn link_providers_contribute_search_on_pseudo_results() {
    let mut descriptor = ProviderDescriptor::link("printables", "Printables");
    descriptor.search_url_template = Some("https://example.com/search?q={q}".to_string());
    let printables = ScriptedAdapter::new(descriptor, ScriptedResponse::Items(vec![]));

    let engine = engine_for(
        vec![printables as Arc<dyn SearchAdapter>],
        EngineConfig::default(),
    );
    let payload = engine
        .execute(&SearchRequest::query("gear"))
        .await
        .unwrap();

    assert!(payload.results.is_empty());
    assert_eq!(payload.link_results.len(), 1);
    assert!(
        payload.link_results[0]
            .result
            .title
            .to_lowercase()
            .contains("gear")
    );
    assert_eq!(payload.links, vec!["printables"]);
    assert_eq!(payload.quick_links.len(), 1);
    assert_eq!(
        payload.quick_links[0].url,
        "https://example.com/search?q=gear"
    );
    assert_eq!(payload.provider_status[0].state, ProviderState::Link);
}

#[tokio::test]
async fn item_level_failures_do_not_sink_sibling_items() {
    let mixed = ScriptedAdapter::new(
        public_descriptor("mixed", "Mixed"),
        ScriptedResponse::Items(vec![
            json!({
                "source": "mixed",
                "id": "good",
                "title": "Good Item",
                "url": "https://mixed.example/good",
            }),
            json!({
                "source": "mixed",
                "id": "bad",
                "title": "Bad Item",
                "url": "notaurl",
            }),
        ]),
    );

    let engine = engine_for(vec![mixed as Arc<dyn SearchAdapter>], EngineConfig::default());
    let payload = engine
        .execute(&SearchRequest::query("item"))
        .await
        .unwrap();

    assert_eq!(payload.results.len(), 1);
    assert_eq!(payload.results[0].result.id, "good");
    assert_eq!(payload.errors.len(), 1);
    assert_eq!(payload.errors[0].source, "mixed");
    // An item-level failure is not a provider-level failure.
    let status = &payload.provider_status[0];
    assert_eq!(status.state, ProviderState::Error);
}

#[tokio::test]
async fn advanced_query_tokens_drive_tab_and_filters() {
    let alpha = ScriptedAdapter::new(
        public_descriptor("alpha", "Alpha"),
        ScriptedResponse::Items(vec![
            json!({
                "source": "alpha",
                "id": "laser-1",
                "title": "Gift Box Pattern",
                "url": "https://alpha.example/laser-1",
                "assetType": "laser2d",
                "meta": { "formats": ["svg"], "price": 0 },
            }),
            json!({
                "source": "alpha",
                "id": "model-1",
                "title": "Gift Box 3D",
                "url": "https://alpha.example/model-1",
                "meta": { "formats": ["stl"], "price": 0 },
            }),
        ]),
    );

    let engine = engine_for(vec![alpha as Arc<dyn SearchAdapter>], EngineConfig::default());
    let payload = engine
        .execute(&SearchRequest::query(
            "source:alpha type:laser format:svg free gift box",
        ))
        .await
        .unwrap();

    assert_eq!(payload.query, "free gift box");
    assert_eq!(payload.query_chips.len(), 3);
    assert_eq!(payload.tab, "laser-cut");
    assert!(payload.intent.free_only);
    assert_eq!(payload.intent.formats, vec!["svg"]);
    // The laser tab plus the svg format filter leave exactly one result.
    assert_eq!(payload.results.len(), 1);
    assert_eq!(payload.results[0].result.id, "laser-1");
}

#[tokio::test]
async fn slow_providers_time_out_without_failing_the_request() {
    let slow = ScriptedAdapter::slow(
        public_descriptor("slow", "Slow"),
        ScriptedResponse::Items(vec![]),
        Duration::from_millis(300),
    );
    let fast = ScriptedAdapter::new(
        public_descriptor("fast", "Fast"),
        ScriptedResponse::Items(vec![json!({
            "source": "fast",
            "id": "f1",
            "title": "Fast Result",
            "url": "https://fast.example/f1",
        })]),
    );

    let engine = engine_for(
        vec![
            slow as Arc<dyn SearchAdapter>,
            fast as Arc<dyn SearchAdapter>,
        ],
        EngineConfig {
            provider_timeout: Duration::from_millis(50),
            ..EngineConfig::default()
        },
    );
    let payload = engine
        .execute(&SearchRequest::query("anything"))
        .await
        .unwrap();

    assert_eq!(payload.results.len(), 1);
    assert_eq!(payload.errors.len(), 1);
    assert_eq!(payload.errors[0].source, "slow");
    assert!(payload.errors[0].message.contains("timed out"));
}

#[tokio::test]
async fn facet_price_buckets_sum_to_total() {
    let shop = ScriptedAdapter::new(
        public_descriptor("shop", "Shop"),
        ScriptedResponse::Items(vec![
            json!({
                "source": "shop", "id": "1", "title": "Free Thing",
                "url": "https://shop.example/1", "meta": { "price": 0 },
            }),
            json!({
                "source": "shop", "id": "2", "title": "Paid Thing",
                "url": "https://shop.example/2", "meta": { "price": 4.5 },
            }),
            json!({
                "source": "shop", "id": "3", "title": "Mystery Thing",
                "url": "https://shop.example/3",
            }),
        ]),
    );

    let engine = engine_for(vec![shop as Arc<dyn SearchAdapter>], EngineConfig::default());
    let payload = engine
        .execute(&SearchRequest::query("thing"))
        .await
        .unwrap();

    let price = &payload.facets.price;
    assert_eq!(price.free, 1);
    assert_eq!(price.paid, 1);
    assert_eq!(price.unknown, 1);
    assert_eq!(
        price.free + price.paid + price.unknown,
        payload.results.len() as u64
    );
}