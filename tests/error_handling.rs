//! Failure-path behavior: rollback, stale-retain, timeouts, guarded misuse.

mod common;

use common::{harness, harness_with};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tacklebox::{ChangeEvent, ClientConfig, SyncError};

#[test]
fn test_mutation_rollback_on_rejection() {
    let h = harness();
    h.remote.respond_value("get_my_gold", json!({"amount": 10}));
    h.remote.fail("adjust_my_gold", "insufficient funds");
    h.identity.login("u-1");
    h.client.gold().ensure_init();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _watch = h.client.gold().watch(move |snap| sink.lock().push(snap.data));

    let result = h.client.gold().adjust(5);
    assert!(matches!(result, Err(SyncError::Remote(_))));

    // Optimistic 15 was visible, then the full pre-mutation value returned.
    assert_eq!(*seen.lock(), vec![15, 10]);
    let snap = h.client.gold().observe();
    assert_eq!(snap.data, 10);
    assert_eq!(snap.error.as_deref(), Some("remote call failed: insufficient funds"));
}

#[test]
fn test_optimistic_clamp_never_goes_negative() {
    let h = harness();
    h.remote.respond_value("get_my_gold", json!({"amount": 10}));
    h.remote.fail("adjust_my_gold", "rejected");
    h.identity.login("u-1");
    h.client.gold().ensure_init();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _watch = h.client.gold().watch(move |snap| sink.lock().push(snap.data));

    let _ = h.client.gold().adjust(-100);

    // Speculative value clamps at zero; rollback restores 10.
    assert_eq!(*seen.lock(), vec![0, 10]);
}

#[test]
fn test_failed_refresh_retains_stale_data() {
    let h = harness();
    h.remote.respond_value("get_my_gold", json!({"amount": 30}));
    h.identity.login("u-1");
    h.client.gold().ensure_init();
    assert_eq!(h.client.gold().observe().data, 30);

    h.remote.fail("get_my_gold", "backend unavailable");
    let result = h.client.gold().refresh();
    assert!(result.is_err());

    // Never blank the UI on a failed refresh.
    let snap = h.client.gold().observe();
    assert_eq!(snap.data, 30);
    assert!(!snap.loading);
    assert!(snap.error.as_deref().unwrap().contains("backend unavailable"));
}

#[test]
fn test_timeout_is_a_failure_with_rollback() {
    let h = harness_with(ClientConfig {
        remote_timeout: Duration::from_millis(40),
    });
    h.remote.respond_value("get_my_gold", json!({"amount": 10}));
    h.remote.respond("adjust_my_gold", |_| {
        std::thread::sleep(Duration::from_millis(400));
        Ok(json!({"amount": 99}))
    });
    h.identity.login("u-1");
    h.client.gold().ensure_init();

    let result = h.client.gold().adjust(5);
    assert!(matches!(result, Err(SyncError::Timeout(_))));

    let snap = h.client.gold().observe();
    assert_eq!(snap.data, 10);
    assert!(snap.error.as_deref().unwrap().contains("timed out"));
}

#[test]
fn test_unauthenticated_mutation_is_guarded() {
    let h = harness();

    let result = h.client.gold().adjust(5);
    assert!(matches!(result, Err(SyncError::NotAuthenticated)));
    assert_eq!(h.remote.call_count("adjust_my_gold"), 0);

    let result = h.client.baits().adjust(1, 1);
    assert!(matches!(result, Err(SyncError::NotAuthenticated)));

    let result = h.client.purchase_bait(1, 1);
    assert!(matches!(result, Err(SyncError::NotAuthenticated)));
}

#[test]
fn test_bag_adjust_unknown_key_is_not_fabricated() {
    let h = harness();
    h.remote.respond_value(
        "get_my_baits",
        json!([{"id": 1, "title": "Worm", "display": "🪱", "qty": 4}]),
    );
    h.identity.login("u-1");
    h.client.baits().ensure_init();
    let reads_before = h.remote.call_count("get_my_baits");

    let result = h.client.baits().adjust(99, 1);
    assert!(matches!(result, Err(SyncError::UnknownEntry(99))));

    // No mutation was attempted; a corrective re-read was.
    assert_eq!(h.remote.call_count("adjust_my_bait"), 0);
    assert_eq!(h.remote.call_count("get_my_baits"), reads_before + 1);
    assert_eq!(h.client.baits().observe().data.len(), 1);
}

#[test]
fn test_bag_rollback_restores_only_target_entry() {
    let h = harness();
    h.remote.respond_value(
        "get_my_baits",
        json!([
            {"id": 1, "title": "Worm", "display": "🪱", "qty": 5},
            {"id": 2, "title": "Shrimp", "display": "🦐", "qty": 7}
        ]),
    );
    h.remote.fail("adjust_my_bait", "out of stock");
    h.identity.login("u-1");
    h.client.baits().ensure_init();

    let result = h.client.baits().adjust(1, 3);
    assert!(result.is_err());

    let baits = h.client.baits().observe();
    assert_eq!(baits.data[0].qty, 5);
    assert_eq!(baits.data[1].qty, 7);
    assert!(baits.error.as_deref().unwrap().contains("out of stock"));
}

#[test]
fn test_malformed_scalar_event_triggers_corrective_refresh() {
    let h = harness();
    h.remote.respond_value("get_my_gold", json!({"amount": 10}));
    h.identity.login("u-1");
    h.client.gold().ensure_init();
    let reads_before = h.remote.call_count("get_my_gold");

    h.remote.respond_value("get_my_gold", json!({"amount": 77}));
    h.channel.push(
        "user_gold",
        ChangeEvent::update(None, json!({"user_id": "u-1", "amount": "garbage"})),
    );

    // The event was never guessed at; the store re-read instead.
    assert_eq!(h.remote.call_count("get_my_gold"), reads_before + 1);
    let snap = h.client.gold().observe();
    assert_eq!(snap.data, 77);
    assert_eq!(snap.error, None);
}

#[test]
fn test_unknown_bag_event_key_triggers_corrective_refresh() {
    let h = harness();
    h.remote.respond_value(
        "get_my_baits",
        json!([{"id": 1, "title": "Worm", "display": "🪱", "qty": 4}]),
    );
    h.identity.login("u-1");
    h.client.baits().ensure_init();
    let reads_before = h.remote.call_count("get_my_baits");

    h.remote.respond_value(
        "get_my_baits",
        json!([
            {"id": 1, "title": "Worm", "display": "🪱", "qty": 4},
            {"id": 9, "title": "Leech", "display": "🪲", "qty": 1}
        ]),
    );
    h.channel
        .push("user_bait", ChangeEvent::insert(json!({"id": 9, "qty": 1})));

    assert_eq!(h.remote.call_count("get_my_baits"), reads_before + 1);
    let baits = h.client.baits().observe();
    assert_eq!(baits.data.len(), 2);
    assert_eq!(baits.data[1].id, 9);
}

#[test]
fn test_malformed_refresh_payload_is_an_error_with_stale_data() {
    let h = harness();
    h.remote.respond_value(
        "get_my_baits",
        json!([{"id": 1, "title": "Worm", "display": "🪱", "qty": 4}]),
    );
    h.identity.login("u-1");
    h.client.baits().ensure_init();

    h.remote.respond_value("get_my_baits", json!([{"id": "not a number"}]));
    let result = h.client.baits().refresh();
    assert!(matches!(result, Err(SyncError::MalformedPayload(_))));

    let baits = h.client.baits().observe();
    assert_eq!(baits.data.len(), 1);
    assert!(baits.error.is_some());
}
