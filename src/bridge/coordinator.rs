//! Signing coordinator.
//!
//! One flow per `TXN_SIGN_REQUEST`:
//!
//! ```text
//! Idle ──decode ok──▶ AwaitingSign ──signer ok, count matches──▶ Resolved
//!   │                      │
//!   └──decode error──▶ Failed ◀──rejected / disconnected / panic / mismatch
//! ```
//!
//! A flow's batch and outcome live in its own future. The shared registry
//! only holds snapshots of flows in `AwaitingSign`, used to mark them when
//! the widget reports a timeout.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::algorand::Transaction;
use crate::bridge::error::SignError;
use crate::bridge::signer::WalletSigner;
use crate::observability::metrics;
use crate::protocol::{Outbound, RequestId, SignRequest, TimeoutNotice, WireBytes};

/// Point-in-time view of a flow waiting on the signer. Flows are removed
/// from the registry once they resolve or fail.
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub flow_id: Uuid,
    pub request_id: Option<RequestId>,
    pub txn_count: usize,
    pub started_at: Instant,
    /// Set when the widget reported it stopped waiting.
    pub timed_out: bool,
}

/// Bridges sign requests to a `WalletSigner`.
pub struct SigningCoordinator {
    signer: Option<Arc<dyn WalletSigner>>,
    flows: DashMap<Uuid, FlowSnapshot>,
    timeouts_signaled: AtomicU64,
}

impl SigningCoordinator {
    pub fn new(signer: Arc<dyn WalletSigner>) -> Self {
        Self {
            signer: Some(signer),
            flows: DashMap::new(),
            timeouts_signaled: AtomicU64::new(0),
        }
    }

    /// A coordinator that answers every request with `not_connected`.
    pub fn without_signer() -> Self {
        Self {
            signer: None,
            flows: DashMap::new(),
            timeouts_signaled: AtomicU64::new(0),
        }
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Run one request to completion and produce the reply envelope.
    pub async fn handle(&self, request: SignRequest) -> Outbound {
        let flow_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "sign_flow",
            flow_id = %flow_id,
            request_id = request.request_id.as_ref().map(tracing::field::display),
            txns = request.txn_count(),
        );
        self.run_flow(flow_id, request).instrument(span).await
    }

    async fn run_flow(&self, flow_id: Uuid, request: SignRequest) -> Outbound {
        let started_at = Instant::now();
        let request_id = request.request_id.clone();
        tracing::debug!(groups = request.tx_groups.len(), "Sign request received");

        let result = self.sign(flow_id, started_at, request).await;
        let timed_out = self
            .flows
            .remove(&flow_id)
            .map(|(_, snapshot)| snapshot.timed_out)
            .unwrap_or(false);
        metrics::set_flows_in_flight(self.flows.len());
        metrics::record_sign_duration(started_at);

        if timed_out {
            metrics::record_late_response();
            tracing::warn!(
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Replying after the widget reported a timeout"
            );
        }

        match result {
            Ok(signed_txns) => {
                metrics::record_sign_outcome("resolved");
                tracing::info!(signed = signed_txns.len(), "Sign request resolved");
                Outbound::SignResponse {
                    request_id,
                    signed_txns,
                }
            }
            Err(err) => {
                metrics::record_sign_outcome(err.code().as_str());
                tracing::warn!(code = %err.code(), error = %err, "Sign request failed");
                failure(request_id, &err)
            }
        }
    }

    async fn sign(
        &self,
        flow_id: Uuid,
        started_at: Instant,
        request: SignRequest,
    ) -> Result<Vec<WireBytes>, SignError> {
        let groups = decode_batch(&request.tx_groups)?;
        let expected = request.txn_count();

        let signer = self.signer.clone().ok_or(SignError::NotConnected)?;
        if !signer.is_connected() {
            return Err(SignError::NotConnected);
        }

        self.flows.insert(
            flow_id,
            FlowSnapshot {
                flow_id,
                request_id: request.request_id.clone(),
                txn_count: expected,
                started_at,
                timed_out: false,
            },
        );
        metrics::set_flows_in_flight(self.flows.len());

        // Nested task so a panicking signer surfaces as a JoinError.
        let task = tokio::spawn(
            async move { signer.sign(groups).await }.instrument(tracing::Span::current()),
        );
        let signed = match task.await {
            Ok(result) => result?,
            Err(join_err) if join_err.is_panic() => {
                tracing::error!("Signer panicked");
                return Err(SignError::SignerRejected("signer panicked".into()));
            }
            Err(join_err) => {
                return Err(SignError::SignerRejected(join_err.to_string()));
            }
        };

        if signed.len() != expected {
            return Err(SignError::ResultMismatch {
                expected,
                actual: signed.len(),
            });
        }
        Ok(signed.into_iter().map(WireBytes).collect())
    }

    /// Mark flows the widget stopped waiting for. With a request id only
    /// the matching flow is marked, otherwise every awaiting flow.
    /// Returns how many flows were marked.
    pub fn record_timeout(&self, notice: &TimeoutNotice) -> usize {
        self.timeouts_signaled.fetch_add(1, Ordering::Relaxed);
        let mut marked = 0;
        for mut flow in self.flows.iter_mut() {
            let matches = match &notice.request_id {
                Some(id) => flow.request_id.as_ref() == Some(id),
                None => true,
            };
            if matches && !flow.timed_out {
                flow.timed_out = true;
                marked += 1;
            }
        }
        tracing::info!(
            request_id = notice.request_id.as_ref().map(tracing::field::display),
            marked,
            "Widget reported sign request timeout"
        );
        marked
    }

    /// Snapshots of flows currently waiting on the signer.
    pub fn in_flight(&self) -> Vec<FlowSnapshot> {
        let mut flows: Vec<FlowSnapshot> = self.flows.iter().map(|f| f.value().clone()).collect();
        flows.sort_by_key(|f| f.started_at);
        flows
    }

    pub fn in_flight_count(&self) -> usize {
        self.flows.len()
    }

    /// Timeout notices received so far.
    pub fn timeouts_signaled(&self) -> u64 {
        self.timeouts_signaled.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SigningCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCoordinator")
            .field("has_signer", &self.signer.is_some())
            .field("in_flight", &self.flows.len())
            .finish()
    }
}

/// `FAILED_TXN_SIGN` for `err`.
pub fn failure(request_id: Option<RequestId>, err: &SignError) -> Outbound {
    Outbound::FailedSign {
        request_id,
        error: err.to_error_info(),
    }
}

/// Empty batches and empty groups pass through with their shape intact.
fn decode_batch(tx_groups: &[Vec<WireBytes>]) -> Result<Vec<Vec<Transaction>>, SignError> {
    tx_groups
        .iter()
        .enumerate()
        .map(|(group, txns)| {
            txns.iter()
                .enumerate()
                .map(|(index, bytes)| {
                    Transaction::decode(bytes.as_slice()).map_err(|source| SignError::Decode {
                        group,
                        index,
                        source,
                    })
                })
                .collect()
        })
        .collect()
}
