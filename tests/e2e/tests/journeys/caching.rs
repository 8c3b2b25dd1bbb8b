//! Response cache round-trips: identical request signatures are served
//! from cache within the TTL without re-invoking any adapter, and miss
//! again after expiry.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use fabsearch_core::{EngineConfig, SearchAdapter, SearchRequest};
use fabsearch_e2e_tests::mocks::{
    ScriptedAdapter, ScriptedResponse, engine_for, public_descriptor,
};

fn gear_adapter() -> Arc<ScriptedAdapter> {
    ScriptedAdapter::new(
        public_descriptor("shop", "Shop"),
        ScriptedResponse::Items(vec![json!({
            "source": "shop",
            "id": "g1",
            "title": "Gear",
            "url": "https://shop.example/g1",
        })]),
    )
}

#[tokio::test]
async fn identical_signature_hits_cache_without_reinvoking_adapters() {
    let adapter = gear_adapter();
    let engine = engine_for(
        vec![adapter.clone() as Arc<dyn SearchAdapter>],
        EngineConfig::default(),
    );
    let request = SearchRequest::query("gear");

    let first = engine.execute(&request).await.unwrap();
    assert!(!first.cached);
    assert_eq!(adapter.calls(), 1);

    let second = engine.execute(&request).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.results.len(), first.results.len());
    assert_eq!(adapter.calls(), 1);
}

#[tokio::test]
async fn cache_misses_after_ttl_expiry() {
    let adapter = gear_adapter();
    let engine = engine_for(
        vec![adapter.clone() as Arc<dyn SearchAdapter>],
        EngineConfig {
            cache_ttl: Duration::from_millis(40),
            ..EngineConfig::default()
        },
    );
    let request = SearchRequest::query("gear");

    let first = engine.execute(&request).await.unwrap();
    assert!(!first.cached);

    tokio::time::sleep(Duration::from_millis(70)).await;

    let third = engine.execute(&request).await.unwrap();
    assert!(!third.cached);
    assert_eq!(adapter.calls(), 2);
}

#[tokio::test]
async fn different_signatures_do_not_share_cache_entries() {
    let adapter = gear_adapter();
    let engine = engine_for(
        vec![adapter.clone() as Arc<dyn SearchAdapter>],
        EngineConfig::default(),
    );

    let _ = engine.execute(&SearchRequest::query("gear")).await.unwrap();
    let narrowed = engine
        .execute(&SearchRequest {
            q: "gear".to_string(),
            limit: Some(5),
            ..SearchRequest::default()
        })
        .await
        .unwrap();

    assert!(!narrowed.cached);
    assert_eq!(adapter.calls(), 2);
}
