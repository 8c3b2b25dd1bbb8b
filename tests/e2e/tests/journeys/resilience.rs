//! Failure containment: circuit-breaker lifecycle and the bounded
//! provider-call admission gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use fabsearch_core::{
    AdapterError, CircuitBreakerConfig, EngineConfig, ProviderQuery, SearchAdapter,
    SearchRequest,
};
use fabsearch_e2e_tests::mocks::{
    ScriptedAdapter, ScriptedResponse, engine_for, public_descriptor,
};

#[tokio::test]
async fn circuit_opens_after_five_failures_and_closes_after_cooldown() {
    let broken = ScriptedAdapter::new(
        public_descriptor("broken", "Broken"),
        ScriptedResponse::Fail("boom".to_string()),
    );
    let engine = engine_for(
        vec![broken.clone() as Arc<dyn SearchAdapter>],
        EngineConfig {
            breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                cooldown: Duration::from_millis(100),
            },
            ..EngineConfig::default()
        },
    );

    // Five distinct requests, five recorded failures.
    for i in 0..5 {
        let payload = engine
            .execute(&SearchRequest::query(format!("gear {i}")))
            .await
            .unwrap();
        assert_eq!(payload.errors.len(), 1);
        assert_eq!(payload.sources, vec!["broken"]);
    }
    assert_eq!(broken.calls(), 5);

    // The circuit is open: the provider is omitted, not an error.
    let skipped = engine
        .execute(&SearchRequest::query("gear skipped"))
        .await
        .unwrap();
    assert!(skipped.sources.is_empty());
    assert!(skipped.errors.is_empty());
    assert_eq!(broken.calls(), 5);

    // Cooldown lapses; the provider is dispatched again.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let retried = engine
        .execute(&SearchRequest::query("gear retried"))
        .await
        .unwrap();
    assert_eq!(retried.sources, vec!["broken"]);
    assert_eq!(broken.calls(), 6);
}

#[tokio::test]
async fn one_success_resets_the_failure_streak() {
    let flaky_calls = Arc::new(AtomicUsize::new(0));

    // Fails every call except the fifth.
    struct FlakyAdapter {
        descriptor: fabsearch_core::ProviderDescriptor,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchAdapter for FlakyAdapter {
        fn descriptor(&self) -> &fabsearch_core::ProviderDescriptor {
            &self.descriptor
        }

        async fn search(&self, _query: &ProviderQuery) -> Result<Value, AdapterError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 5 {
                Ok(json!([]))
            } else {
                Err(AdapterError::Other("flaky".to_string()))
            }
        }
    }

    let engine = engine_for(
        vec![Arc::new(FlakyAdapter {
            descriptor: public_descriptor("flaky", "Flaky"),
            calls: flaky_calls.clone(),
        }) as Arc<dyn SearchAdapter>],
        EngineConfig::default(),
    );

    // Four failures, one success, four more failures: never five in a row.
    for i in 0..9 {
        let payload = engine
            .execute(&SearchRequest::query(format!("q {i}")))
            .await
            .unwrap();
        assert_eq!(payload.sources, vec!["flaky"], "request {i} was dispatched");
    }
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 9);
}

#[tokio::test]
async fn provider_fan_out_is_bounded_by_the_admission_gate() {
    struct GaugeAdapter {
        descriptor: fabsearch_core::ProviderDescriptor,
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchAdapter for GaugeAdapter {
        fn descriptor(&self) -> &fabsearch_core::ProviderDescriptor {
            &self.descriptor
        }

        async fn search(&self, _query: &ProviderQuery) -> Result<Value, AdapterError> {
            let in_flight = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(in_flight, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(json!([]))
        }
    }

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let adapters: Vec<Arc<dyn SearchAdapter>> = (0..10)
        .map(|i| {
            Arc::new(GaugeAdapter {
                descriptor: public_descriptor(&format!("p{i}"), &format!("P{i}")),
                current: current.clone(),
                peak: peak.clone(),
            }) as Arc<dyn SearchAdapter>
        })
        .collect();

    let engine = engine_for(adapters, EngineConfig::default());
    let payload = engine
        .execute(&SearchRequest::query("burst"))
        .await
        .unwrap();

    assert_eq!(payload.sources.len(), 10);
    assert!(
        peak.load(Ordering::SeqCst) <= 4,
        "no more than 4 provider calls may be in flight at once"
    );
}
