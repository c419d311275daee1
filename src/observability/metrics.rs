//! Metrics collection.
//!
//! # Metrics
//! - `widget_inbound_messages_total` (counter): envelopes accepted, by type
//! - `widget_origin_rejected_total` (counter): envelopes dropped by the origin policy
//! - `widget_outbound_messages_total` (counter): envelopes posted, by type
//! - `widget_sign_requests_total` (counter): finished sign flows, by outcome
//! - `widget_sign_duration_seconds` (histogram): time from request to reply
//! - `widget_sign_flows_in_flight` (gauge): flows waiting on the signer
//! - `widget_sign_late_responses_total` (counter): replies sent after a timeout notice
//! - `quote_service_requests_total` (counter): Quote Service calls, by endpoint and status
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels are fixed, low-cardinality strings

use std::time::Instant;

pub fn record_inbound(message_type: &'static str) {
    metrics::counter!("widget_inbound_messages_total", "type" => message_type).increment(1);
}

pub fn record_origin_rejected() {
    metrics::counter!("widget_origin_rejected_total").increment(1);
}

pub fn record_outbound(message_type: &'static str) {
    metrics::counter!("widget_outbound_messages_total", "type" => message_type).increment(1);
}

/// `outcome` is `resolved` or an error code.
pub fn record_sign_outcome(outcome: &'static str) {
    metrics::counter!("widget_sign_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_sign_duration(started_at: Instant) {
    metrics::histogram!("widget_sign_duration_seconds").record(started_at.elapsed().as_secs_f64());
}

pub fn set_flows_in_flight(count: usize) {
    metrics::gauge!("widget_sign_flows_in_flight").set(count as f64);
}

pub fn record_late_response() {
    metrics::counter!("widget_sign_late_responses_total").increment(1);
}

pub fn record_quote_request(endpoint: &'static str, status: u16) {
    metrics::counter!(
        "quote_service_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}
