//! Contract Test: Reconciliation Cycle
//!
//! Constraints verified:
//! - The record is only updated when the cached address differs from the WAN IP
//! - A successful update caches the published address with a full counter
//! - Exhausted retries abort the cycle and leave the cache as it was
//! - Retry attempts and backoff waits follow base_delay * 2^(n-1)

mod common;

use common::*;
use ddns_core::{CycleOutcome, CycleStage, MAX_USES};

#[tokio::test]
async fn first_cycle_resolves_before_comparing() {
    let h = harness(ip(1, 2, 3, 4));

    let outcome = h.engine.run().await;

    assert_eq!(outcome, CycleOutcome::NoUpdateNeeded { ip: ip(1, 2, 3, 4) });
    assert_eq!(h.resolver.lookups(), vec!["home.example.com".to_string()]);
    assert_eq!(h.provider.update_call_count(), 0);

    let cache = h.engine.cache_state().await;
    assert_eq!(cache.cached_ip(), Some(ip(1, 2, 3, 4)));
    assert_eq!(cache.uses_remaining(), MAX_USES);
}

#[tokio::test]
async fn matching_cache_issues_no_update() {
    // cachedIp = 1.2.3.4, wanIp = 1.2.3.4
    let h = harness(ip(1, 2, 3, 4));
    h.engine.run().await;

    let outcome = h.engine.run().await;

    assert_eq!(outcome, CycleOutcome::NoUpdateNeeded { ip: ip(1, 2, 3, 4) });
    assert_eq!(h.resolver.lookup_count(), 1, "cached answer should be trusted");
    assert_eq!(h.provider.update_call_count(), 0);
}

#[tokio::test]
async fn changed_wan_ip_updates_record_and_cache() {
    // cachedIp = 1.2.3.4, wanIp = 5.6.7.8, API answers 200
    let h = harness(ip(1, 2, 3, 4));
    h.engine.run().await;
    h.wan.set_ip(ip(5, 6, 7, 8));

    let outcome = h.engine.run().await;

    assert_eq!(
        outcome,
        CycleOutcome::Updated {
            previous_ip: ip(1, 2, 3, 4),
            new_ip: ip(5, 6, 7, 8),
        }
    );

    let calls = h.provider.calls();
    assert_eq!(
        calls,
        vec![UpdateCall {
            zone: "example.com".to_string(),
            record_name: "home".to_string(),
            api_key: "test-api-key".to_string(),
            new_ip: ip(5, 6, 7, 8),
            ttl_secs: 300,
        }]
    );

    let cache = h.engine.cache_state().await;
    assert_eq!(cache.cached_ip(), Some(ip(5, 6, 7, 8)));
    assert_eq!(cache.uses_remaining(), MAX_USES);
}

#[tokio::test]
async fn update_after_success_is_not_repeated() {
    let h = harness(ip(1, 2, 3, 4));
    h.engine.run().await;
    h.wan.set_ip(ip(5, 6, 7, 8));
    h.engine.run().await;

    let outcome = h.engine.run().await;

    assert_eq!(outcome, CycleOutcome::NoUpdateNeeded { ip: ip(5, 6, 7, 8) });
    assert_eq!(h.provider.update_call_count(), 1);
    assert_eq!(h.resolver.lookup_count(), 1);
}

#[tokio::test]
async fn exhausted_update_leaves_cache_unchanged() {
    // API answers 500 on all 3 attempts
    let h = harness(ip(1, 2, 3, 4));
    h.engine.run().await;
    let before = h.engine.cache_state().await;

    h.wan.set_ip(ip(5, 6, 7, 8));
    h.provider.fail_always(true);
    h.backoff.clear();

    let outcome = h.engine.run().await;

    match outcome {
        CycleOutcome::Aborted { stage, reason } => {
            assert_eq!(stage, CycleStage::Updating);
            assert!(reason.contains("update home.example.com"), "reason: {}", reason);
        }
        other => panic!("expected abort, got {:?}", other),
    }

    assert_eq!(h.provider.update_call_count(), 3);
    assert_eq!(h.backoff.delays(), vec![BASE_DELAY, BASE_DELAY * 2]);

    let after = h.engine.cache_state().await;
    assert_eq!(after.cached_ip(), Some(ip(1, 2, 3, 4)));
    assert_eq!(after.cached_ip(), before.cached_ip());
}

#[tokio::test]
async fn failed_update_is_retried_next_cycle() {
    let h = harness(ip(1, 2, 3, 4));
    h.engine.run().await;
    h.wan.set_ip(ip(5, 6, 7, 8));
    h.provider.fail_always(true);
    h.engine.run().await;

    h.provider.fail_always(false);
    let outcome = h.engine.run().await;

    assert!(matches!(outcome, CycleOutcome::Updated { .. }));
    assert_eq!(h.provider.update_call_count(), 4);
}

#[tokio::test]
async fn wan_ip_retried_once_then_cycle_proceeds() {
    // Public-IP fetch fails once, then succeeds
    let h = harness(ip(1, 2, 3, 4));
    h.wan.fail_next();

    let outcome = h.engine.run().await;

    assert_eq!(outcome, CycleOutcome::NoUpdateNeeded { ip: ip(1, 2, 3, 4) });
    assert_eq!(h.wan.call_count(), 2);
    assert_eq!(h.backoff.delays(), vec![BASE_DELAY]);
}

#[tokio::test]
async fn exhausted_wan_ip_aborts_without_touching_state() {
    let h = harness(ip(1, 2, 3, 4));
    h.wan.fail_always();

    let outcome = h.engine.run().await;

    assert!(matches!(
        outcome,
        CycleOutcome::Aborted {
            stage: CycleStage::FetchingWanIp,
            ..
        }
    ));
    assert_eq!(h.wan.call_count(), 3);
    assert_eq!(h.resolver.lookup_count(), 0);
    assert_eq!(h.provider.update_call_count(), 0);
    assert_eq!(h.engine.cache_state().await, ddns_core::DomainIpCache::new());
}
