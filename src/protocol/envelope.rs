//! Envelope classification and serialization.
//!
//! Inbound: `{ "type": T, "message": {...} }`, optionally with `requestId`
//! inside `message` or next to `type`.
//!
//! Outbound: `{ "type": T, "message": { "type": T, ...payload } }`. The tag is
//! written at both levels; widget builds differ in which one they read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::protocol::bytes::WireBytes;
use crate::protocol::message::MessageType;

/// Correlation id chosen by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl RequestId {
    /// Read an id from a JSON value. Anything but a string or an integer
    /// is treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(RequestId::Number),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestId::Number(n) => Value::from(*n),
            RequestId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::Text(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

/// `TXN_SIGN_REQUEST` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub request_id: Option<RequestId>,
    /// Encoded unsigned transactions, grouped as the widget sent them.
    pub tx_groups: Vec<Vec<WireBytes>>,
}

impl SignRequest {
    pub fn new(tx_groups: Vec<Vec<WireBytes>>) -> Self {
        Self {
            request_id: None,
            tx_groups,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Total number of transactions across all groups.
    pub fn txn_count(&self) -> usize {
        self.tx_groups.iter().map(Vec::len).sum()
    }

    /// The envelope a widget posts for this request.
    pub fn to_wire(&self) -> Value {
        let mut message = Map::new();
        message.insert(
            "txGroups".into(),
            serde_json::to_value(&self.tx_groups).unwrap_or(Value::Null),
        );
        if let Some(id) = &self.request_id {
            message.insert("requestId".into(), id.to_value());
        }
        serde_json::json!({
            "type": MessageType::TxnSignRequest.as_str(),
            "message": Value::Object(message),
        })
    }
}

/// `TXN_SIGN_REQUEST_TIMEOUT` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeoutNotice {
    pub request_id: Option<RequestId>,
}

/// `SWAP_SUCCESS` payload, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapResult {
    pub payload: Value,
}

/// A classified inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    SignRequest(SignRequest),
    /// A sign request whose body is not `{ txGroups: bytes[][] }`.
    MalformedSignRequest {
        request_id: Option<RequestId>,
        reason: String,
    },
    SignRequestTimeout(TimeoutNotice),
    SwapSuccess(SwapResult),
    /// A known tag that the host never handles, e.g. its own replies echoed back.
    Unrouted(MessageType),
    /// A tag this build does not know.
    Unknown(String),
}

impl Inbound {
    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::SignRequest(_) | Inbound::MalformedSignRequest { .. } => {
                MessageType::TxnSignRequest.as_str()
            }
            Inbound::SignRequestTimeout(_) => MessageType::TxnSignRequestTimeout.as_str(),
            Inbound::SwapSuccess(_) => MessageType::SwapSuccess.as_str(),
            Inbound::Unrouted(t) => t.as_str(),
            Inbound::Unknown(_) => "unknown",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignRequestBody {
    tx_groups: Vec<Vec<WireBytes>>,
}

/// Same notion of "present" the widget uses for `type` and `message`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Classify a raw inbound message.
///
/// Returns `None` for anything that is not an envelope: non-objects, a
/// missing or non-string `type`, or a missing `message`.
pub fn classify(raw: &Value) -> Option<Inbound> {
    let envelope = raw.as_object()?;
    let tag = match envelope.get("type") {
        Some(Value::String(tag)) if !tag.is_empty() => tag,
        _ => return None,
    };
    let message = envelope.get("message").filter(|m| is_truthy(m))?;

    let request_id = message
        .get("requestId")
        .and_then(RequestId::from_value)
        .or_else(|| envelope.get("requestId").and_then(RequestId::from_value));

    let inbound = match MessageType::from_tag(tag) {
        Some(MessageType::TxnSignRequest) => {
            match SignRequestBody::deserialize(message) {
                Ok(body) => Inbound::SignRequest(SignRequest {
                    request_id,
                    tx_groups: body.tx_groups,
                }),
                Err(e) => Inbound::MalformedSignRequest {
                    request_id,
                    reason: e.to_string(),
                },
            }
        }
        Some(MessageType::TxnSignRequestTimeout) => {
            Inbound::SignRequestTimeout(TimeoutNotice { request_id })
        }
        Some(MessageType::SwapSuccess) => Inbound::SwapSuccess(SwapResult {
            payload: message.clone(),
        }),
        Some(other) => Inbound::Unrouted(other),
        None => Inbound::Unknown(tag.clone()),
    };
    Some(inbound)
}

/// Machine-readable failure reason sent in `FAILED_TXN_SIGN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DecodeError,
    SignerRejected,
    NotConnected,
    ResultMismatch,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DecodeError => "decode_error",
            ErrorCode::SignerRejected => "signer_rejected",
            ErrorCode::NotConnected => "not_connected",
            ErrorCode::ResultMismatch => "result_mismatch",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body of `FAILED_TXN_SIGN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// An envelope the host sends to the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    SignResponse {
        request_id: Option<RequestId>,
        signed_txns: Vec<WireBytes>,
    },
    FailedSign {
        request_id: Option<RequestId>,
        error: ErrorInfo,
    },
}

impl Outbound {
    pub fn message_type(&self) -> MessageType {
        match self {
            Outbound::SignResponse { .. } => MessageType::TxnSignResponse,
            Outbound::FailedSign { .. } => MessageType::FailedTxnSign,
        }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Outbound::SignResponse { request_id, .. } | Outbound::FailedSign { request_id, .. } => {
                request_id.as_ref()
            }
        }
    }

    pub fn to_wire(&self) -> Value {
        let tag = self.message_type();
        let mut message = Map::new();
        message.insert("type".into(), Value::String(tag.as_str().to_string()));
        match self {
            Outbound::SignResponse { signed_txns, .. } => {
                let encoded = signed_txns
                    .iter()
                    .map(|b| Value::String(b.to_base64()))
                    .collect();
                message.insert("signedTxns".into(), Value::Array(encoded));
            }
            Outbound::FailedSign { error, .. } => {
                message.insert(
                    "error".into(),
                    serde_json::json!({ "code": error.code, "message": error.message }),
                );
            }
        }
        if let Some(id) = self.request_id() {
            message.insert("requestId".into(), id.to_value());
        }
        serde_json::json!({ "type": tag.as_str(), "message": Value::Object(message) })
    }

    /// Parse a host reply the way a widget would. Accepts the tag at either
    /// level of the envelope.
    pub fn from_wire(raw: &Value) -> Option<Self> {
        let message = raw.get("message")?;
        let tag = message
            .get("type")
            .or_else(|| raw.get("type"))
            .and_then(Value::as_str)
            .and_then(MessageType::from_tag)?;
        let request_id = message.get("requestId").and_then(RequestId::from_value);
        match tag {
            MessageType::TxnSignResponse => {
                let signed_txns =
                    Vec::<WireBytes>::deserialize(message.get("signedTxns")?).ok()?;
                Some(Outbound::SignResponse {
                    request_id,
                    signed_txns,
                })
            }
            MessageType::FailedTxnSign => {
                let error = ErrorInfo::deserialize(message.get("error")?).ok()?;
                Some(Outbound::FailedSign { request_id, error })
            }
            _ => None,
        }
    }
}
