//! End-to-end message bridge tests: a widget window posts envelopes to a host
//! window and the controller answers through a wallet signer.

mod common;

use common::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use swap_widget_host::bridge::{
    InboundMessage, LocalWindow, OriginPolicy, PostedMessage, SignerError, SigningCoordinator,
    WidgetController, WidgetHandlers,
};
use swap_widget_host::protocol::{ErrorCode, Outbound, RequestId, WireBytes};

const REPLY_WAIT: Duration = Duration::from_secs(2);
const QUIET_WAIT: Duration = Duration::from_millis(200);

struct Harness {
    host: LocalWindow,
    widget: LocalWindow,
    controller: WidgetController,
}

impl Harness {
    fn new() -> Self {
        let host = LocalWindow::with_origin("https://host.example");
        let widget = LocalWindow::with_origin(WIDGET_ORIGIN);
        let controller = WidgetController::new(Arc::new(host.clone()));
        Self {
            host,
            widget,
            controller,
        }
    }

    fn post(&self, data: Value) -> usize {
        deliver_from(&self.host, &self.widget, WIDGET_ORIGIN, data)
    }

    async fn reply(&self) -> PostedMessage {
        self.widget
            .recv_timeout(REPLY_WAIT)
            .await
            .expect("widget should receive a reply")
    }

    async fn assert_quiet(&self) {
        assert!(self.widget.recv_timeout(QUIET_WAIT).await.is_none());
    }
}

fn failure_code(reply: &PostedMessage) -> ErrorCode {
    match Outbound::from_wire(&reply.data) {
        Some(Outbound::FailedSign { error, .. }) => error.code,
        other => panic!("expected FAILED_TXN_SIGN, got {other:?}"),
    }
}

#[tokio::test]
async fn test_signs_groups_in_flattened_order() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.post(sign_request("r-1", &[1, 2]).to_wire());

    let reply = h.reply().await;
    assert_eq!(reply.target_origin, WIDGET_ORIGIN);
    assert_eq!(reply.data["type"], "TXN_SIGN_RESPONSE");
    assert_eq!(reply.data["message"]["type"], "TXN_SIGN_RESPONSE");
    assert_eq!(reply.data["message"]["requestId"], "r-1");

    let signed: Vec<String> = reply.data["message"]["signedTxns"]
        .as_array()
        .unwrap()
        .iter()
        .map(signature_text)
        .collect();
    assert_eq!(signed, vec!["sig:1", "sig:2", "sig:3"]);
    assert_eq!(signer.calls(), 1);
}

#[tokio::test]
async fn test_rejection_sends_exactly_one_failure() {
    let h = Harness::new();
    let signer = Arc::new(RecordingSigner::new(SignBehavior::Reject(
        SignerError::Declined("user closed the wallet".into()),
    )));
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.post(sign_request(9i64, &[1]).to_wire());

    let reply = h.reply().await;
    assert_eq!(reply.data["type"], "FAILED_TXN_SIGN");
    assert_eq!(reply.data["message"]["requestId"], 9);
    assert_eq!(failure_code(&reply), ErrorCode::SignerRejected);
    assert!(reply.data["message"]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("user closed the wallet"));
    h.assert_quiet().await;
}

#[tokio::test]
async fn test_decode_error_never_reaches_signer() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    let good = WireBytes(pay_txn(&account(1), 5)).to_base64();
    h.post(json!({
        "type": "TXN_SIGN_REQUEST",
        "message": { "requestId": "bad", "txGroups": [[good, "AAEC"]] }
    }));

    let reply = h.reply().await;
    assert_eq!(failure_code(&reply), ErrorCode::DecodeError);
    assert_eq!(reply.data["message"]["requestId"], "bad");
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn test_shape_errors_answer_with_decode_error() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.post(json!({ "type": "TXN_SIGN_REQUEST", "message": { "requestId": 1, "txGroups": "nope" } }));
    assert_eq!(failure_code(&h.reply().await), ErrorCode::DecodeError);

    h.post(json!({ "type": "TXN_SIGN_REQUEST", "message": { "requestId": 2, "txGroups": [["AAEC"], "x"] } }));
    assert_eq!(failure_code(&h.reply().await), ErrorCode::DecodeError);

    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn test_empty_batches_sign_to_empty_results() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    for (id, groups) in [("none", json!([])), ("hollow", json!([[]]))] {
        h.post(json!({ "type": "TXN_SIGN_REQUEST", "message": { "requestId": id, "txGroups": groups } }));
        let reply = h.reply().await;
        assert_eq!(reply.data["type"], "TXN_SIGN_RESPONSE");
        assert_eq!(reply.data["message"]["requestId"], id);
        assert_eq!(reply.data["message"]["signedTxns"], json!([]));
    }
    assert_eq!(signer.calls(), 2);
}

#[tokio::test]
async fn test_result_count_mismatch() {
    let h = Harness::new();
    let signer = Arc::new(RecordingSigner::new(SignBehavior::Short(1)));
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer));

    h.post(sign_request("short", &[2]).to_wire());
    assert_eq!(failure_code(&h.reply().await), ErrorCode::ResultMismatch);
}

#[tokio::test]
async fn test_missing_signer_answers_not_connected() {
    let h = Harness::new();
    let _registration = h.controller.register(WidgetHandlers::new());

    h.post(sign_request("x", &[1]).to_wire());
    assert_eq!(failure_code(&h.reply().await), ErrorCode::NotConnected);
}

#[tokio::test]
async fn test_disconnected_signer_answers_not_connected() {
    let h = Harness::new();
    let signer = Arc::new(RecordingSigner::new(SignBehavior::Sign).disconnected());
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.post(sign_request("x", &[1]).to_wire());
    assert_eq!(failure_code(&h.reply().await), ErrorCode::NotConnected);
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn test_register_twice_keeps_one_listener() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let hits = Arc::new(AtomicUsize::new(0));
    let handlers = {
        let hits = hits.clone();
        WidgetHandlers::new()
            .with_signer(signer.clone())
            .on_swap_success(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
    };

    let _first = h.controller.register(handlers.clone());
    let _second = h.controller.register(handlers);
    assert_eq!(h.host.listener_count(), 1);

    h.post(sign_request("one", &[1]).to_wire());
    h.post(sign_request("two", &[1]).to_wire());
    h.reply().await;
    h.reply().await;
    h.assert_quiet().await;
    assert_eq!(signer.calls(), 2);

    let success = json!({ "type": "SWAP_SUCCESS", "message": { "txId": "ABC" } });
    h.post(success.clone());
    h.post(success);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unregister_twice_is_harmless() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    h.controller
        .register(WidgetHandlers::new().with_signer(signer.clone()))
        .detach();

    assert!(h.controller.unregister());
    assert!(!h.controller.unregister());
    assert_eq!(h.post(sign_request("gone", &[1]).to_wire()), 0);
    h.assert_quiet().await;
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn test_non_envelopes_are_ignored() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let hits = Arc::new(AtomicUsize::new(0));
    let handlers = {
        let hits = hits.clone();
        WidgetHandlers::new()
            .with_signer(signer.clone())
            .on_swap_success(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
    };
    let _registration = h.controller.register(handlers);

    for data in [
        json!("TXN_SIGN_REQUEST"),
        json!(42),
        Value::Null,
        json!([1, 2, 3]),
        json!({ "type": "SWAP_SUCCESS" }),
        json!({ "type": "SWAP_SUCCESS", "message": "" }),
        json!({ "type": "SWAP_SUCCESS", "message": 0 }),
        json!({ "type": "SWAP_SUCCESS", "message": null }),
        json!({ "type": 7, "message": { "txGroups": [] } }),
        json!({ "type": "", "message": { "txGroups": [] } }),
        json!({ "message": { "txGroups": [] } }),
        json!({ "type": "SOMETHING_NEW", "message": { "a": 1 } }),
        json!({ "type": "TXN_SIGN_RESPONSE", "message": { "signedTxns": [] } }),
    ] {
        h.post(data);
    }

    h.assert_quiet().await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(signer.calls(), 0);
    assert!(h.controller.is_registered());
}

#[tokio::test]
async fn test_late_reply_after_timeout_notice() {
    let h = Harness::new();
    let signer = Arc::new(
        RecordingSigner::new(SignBehavior::Sign).with_delay(|_| Duration::from_millis(300)),
    );
    let coordinator = Arc::new(SigningCoordinator::new(signer));
    let timeouts = Arc::new(AtomicUsize::new(0));
    let handlers = {
        let timeouts = timeouts.clone();
        WidgetHandlers::new()
            .with_coordinator(coordinator.clone())
            .on_sign_request_timeout(move |notice| {
                assert_eq!(notice.request_id, Some(RequestId::from("slow")));
                timeouts.fetch_add(1, Ordering::SeqCst);
            })
    };
    let _registration = h.controller.register(handlers);

    h.post(sign_request("slow", &[1]).to_wire());
    for _ in 0..100 {
        if coordinator.in_flight_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(coordinator.in_flight_count(), 1);

    h.post(timeout_notice(json!("slow")));
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.timeouts_signaled(), 1);
    assert!(coordinator.in_flight()[0].timed_out);

    let reply = h.reply().await;
    assert_eq!(reply.data["type"], "TXN_SIGN_RESPONSE");
    assert_eq!(reply.data["message"]["requestId"], "slow");
    assert_eq!(coordinator.in_flight_count(), 0);
}

#[tokio::test]
async fn test_timeout_without_pending_request() {
    let h = Harness::new();
    let timeouts = Arc::new(AtomicUsize::new(0));
    let handlers = {
        let timeouts = timeouts.clone();
        WidgetHandlers::new()
            .with_signer(RecordingSigner::signing())
            .on_sign_request_timeout(move |_| {
                timeouts.fetch_add(1, Ordering::SeqCst);
            })
    };
    let _registration = h.controller.register(handlers);

    h.post(timeout_notice(json!(404)));
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    h.assert_quiet().await;
}

#[tokio::test]
async fn test_disallowed_origin_is_dropped() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    deliver_from(
        &h.host,
        &h.widget,
        "https://evil.example",
        sign_request("steal", &[1]).to_wire(),
    );

    h.assert_quiet().await;
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn test_wildcard_policy_replies_with_wildcard() {
    let host = LocalWindow::with_origin("https://host.example");
    let widget = LocalWindow::with_origin("http://localhost:5173");
    let controller = WidgetController::with_policy(Arc::new(host.clone()), OriginPolicy::Any);
    let _registration =
        controller.register(WidgetHandlers::new().with_signer(RecordingSigner::signing()));

    deliver_from(
        &host,
        &widget,
        "http://localhost:5173",
        sign_request(1i64, &[1]).to_wire(),
    );

    let reply = widget.recv_timeout(REPLY_WAIT).await.unwrap();
    assert_eq!(reply.target_origin, "*");
    assert_eq!(reply.data["type"], "TXN_SIGN_RESPONSE");
}

#[tokio::test]
async fn test_concurrent_requests_correlate_by_request_id() {
    let h = Harness::new();
    // Bigger batches take longer, so the second request finishes first.
    let signer = Arc::new(RecordingSigner::new(SignBehavior::Sign).with_delay(|groups| {
        let txns: usize = groups.iter().map(Vec::len).sum();
        Duration::from_millis(50 * txns as u64)
    }));
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.post(sign_request("big", &[2, 2]).to_wire());
    h.post(sign_request("small", &[1]).to_wire());

    let first = h.reply().await;
    let second = h.reply().await;
    assert_eq!(first.data["message"]["requestId"], "small");
    assert_eq!(first.data["message"]["signedTxns"].as_array().unwrap().len(), 1);
    assert_eq!(second.data["message"]["requestId"], "big");
    assert_eq!(second.data["message"]["signedTxns"].as_array().unwrap().len(), 4);
    assert_eq!(signer.calls(), 2);
}

#[tokio::test]
async fn test_envelope_level_request_id_is_echoed() {
    let h = Harness::new();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(RecordingSigner::signing()));

    let mut data = sign_request("unused", &[1]).to_wire();
    data["message"]
        .as_object_mut()
        .unwrap()
        .remove("requestId");
    data["requestId"] = json!(77);
    h.post(data);

    let reply = h.reply().await;
    assert_eq!(reply.data["message"]["requestId"], 77);
}

#[tokio::test]
async fn test_missing_source_means_no_reply() {
    let h = Harness::new();
    let signer = RecordingSigner::signing();
    let _registration = h
        .controller
        .register(WidgetHandlers::new().with_signer(signer.clone()));

    h.host.deliver(InboundMessage::new(
        sign_request("orphan", &[1]).to_wire(),
        WIDGET_ORIGIN,
        None,
    ));

    h.assert_quiet().await;
    assert_eq!(signer.calls(), 1);
}

#[tokio::test]
async fn test_stale_registration_does_not_unbind_newer_one() {
    let h = Harness::new();
    let first = h.controller.register(WidgetHandlers::new());
    let second = h
        .controller
        .register(WidgetHandlers::new().with_signer(RecordingSigner::signing()));

    drop(first);
    assert!(second.is_active());

    h.post(sign_request("still-bound", &[1]).to_wire());
    assert_eq!(h.reply().await.data["type"], "TXN_SIGN_RESPONSE");
}

#[tokio::test]
async fn test_dropping_controller_releases_binding() {
    let Harness {
        host,
        widget,
        controller,
    } = Harness::new();
    controller
        .register(WidgetHandlers::new().with_signer(RecordingSigner::signing()))
        .detach();
    assert_eq!(host.listener_count(), 1);

    drop(controller);
    assert_eq!(host.listener_count(), 0);
    assert_eq!(
        deliver_from(&host, &widget, WIDGET_ORIGIN, sign_request(1i64, &[1]).to_wire()),
        0
    );
}

