//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use swap_widget_host::algorand::{Address, Transaction};
use swap_widget_host::bridge::{InboundMessage, LocalWindow, SignerError, WalletSigner};
use swap_widget_host::protocol::{RequestId, SignRequest, WireBytes};

/// Origin the test widget documents run on.
pub const WIDGET_ORIGIN: &str = "https://swap-widget.perawallet.app";

/// A request the mock backend received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Start a mock backend that answers every request with `200` and `body`.
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    start_programmable_backend(addr, move |_| async move { (200, body.to_string()) }).await;
}

/// Start a mock backend whose response is computed from the request.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that records every request and replies with `body`.
pub async fn start_recording_backend(
    addr: SocketAddr,
    status: u16,
    body: String,
) -> Arc<Mutex<Vec<RecordedRequest>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    start_programmable_backend(addr, move |request| {
        log.lock().unwrap().push(request);
        let body = body.clone();
        async move { (status, body) }
    })
    .await;
    seen
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        target,
        body,
    })
}

/// Deterministic test account.
pub fn account(seed: u8) -> Address {
    Address::from_bytes([seed; 32])
}

/// A canonically encoded payment transaction.
pub fn pay_txn(sender: &Address, amount: u64) -> Vec<u8> {
    use rmpv::Value as Mp;
    let mut fields = Vec::new();
    if amount > 0 {
        fields.push((Mp::from("amt"), Mp::from(amount)));
    }
    fields.extend([
        (Mp::from("fee"), Mp::from(1_000u64)),
        (Mp::from("fv"), Mp::from(10u64)),
        (Mp::from("lv"), Mp::from(1_010u64)),
        (Mp::from("rcv"), Mp::Binary(account(0xEE).as_bytes().to_vec())),
        (Mp::from("snd"), Mp::Binary(sender.as_bytes().to_vec())),
        (Mp::from("type"), Mp::from("pay")),
    ]);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &Mp::Map(fields)).unwrap();
    buf
}

/// A sign request of payment transactions with the given group sizes.
/// Amounts count up from 1 across the whole batch.
pub fn sign_request(request_id: impl Into<RequestId>, group_sizes: &[usize]) -> SignRequest {
    let sender = account(7);
    let mut amount = 0;
    let groups = group_sizes
        .iter()
        .map(|&size| {
            (0..size)
                .map(|_| {
                    amount += 1;
                    WireBytes(pay_txn(&sender, amount))
                })
                .collect()
        })
        .collect();
    SignRequest::new(groups).with_request_id(request_id)
}

/// Deliver `data` to `host` as if posted by `widget` from `origin`.
pub fn deliver_from(host: &LocalWindow, widget: &LocalWindow, origin: &str, data: Value) -> usize {
    host.deliver(InboundMessage::new(data, origin, Some(widget.handle())))
}

pub fn timeout_notice(request_id: Value) -> Value {
    json!({
        "type": "TXN_SIGN_REQUEST_TIMEOUT",
        "message": { "requestId": request_id }
    })
}

/// What a `RecordingSigner` does with each batch.
#[derive(Clone)]
pub enum SignBehavior {
    /// Sign each transaction as `"sig:" + amount`.
    Sign,
    Reject(SignerError),
    /// Return this many results regardless of input.
    Short(usize),
}

/// Signer that counts calls and can be slowed down per call.
pub struct RecordingSigner {
    behavior: SignBehavior,
    delay: Box<dyn Fn(&[Vec<Transaction>]) -> Duration + Send + Sync>,
    calls: AtomicUsize,
    connected: bool,
}

impl RecordingSigner {
    pub fn new(behavior: SignBehavior) -> Self {
        Self {
            behavior,
            delay: Box::new(|_| Duration::ZERO),
            calls: AtomicUsize::new(0),
            connected: true,
        }
    }

    pub fn signing() -> Arc<Self> {
        Arc::new(Self::new(SignBehavior::Sign))
    }

    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&[Vec<Transaction>]) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for RecordingSigner {
    async fn sign(&self, groups: Vec<Vec<Transaction>>) -> Result<Vec<Vec<u8>>, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = (self.delay)(&groups);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            SignBehavior::Sign => Ok(groups
                .iter()
                .flatten()
                .map(|txn| format!("sig:{}", txn.amount).into_bytes())
                .collect()),
            SignBehavior::Reject(err) => Err(err.clone()),
            SignBehavior::Short(n) => Ok(vec![b"sig".to_vec(); *n]),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Decode a signed-transaction entry produced by `RecordingSigner`.
pub fn signature_text(entry: &Value) -> String {
    let bytes = WireBytes::from_base64(entry.as_str().unwrap()).unwrap();
    String::from_utf8(bytes.into_inner()).unwrap()
}
