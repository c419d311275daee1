//! Message type tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the channel emits a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    WidgetToHost,
    HostToWidget,
}

/// The closed set of tags the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    TxnSignRequest,
    TxnSignResponse,
    FailedTxnSign,
    TxnSignRequestTimeout,
    SwapSuccess,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::TxnSignRequest,
        MessageType::TxnSignResponse,
        MessageType::FailedTxnSign,
        MessageType::TxnSignRequestTimeout,
        MessageType::SwapSuccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::TxnSignRequest => "TXN_SIGN_REQUEST",
            MessageType::TxnSignResponse => "TXN_SIGN_RESPONSE",
            MessageType::FailedTxnSign => "FAILED_TXN_SIGN",
            MessageType::TxnSignRequestTimeout => "TXN_SIGN_REQUEST_TIMEOUT",
            MessageType::SwapSuccess => "SWAP_SUCCESS",
        }
    }

    /// Exact, case-sensitive tag lookup.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn direction(&self) -> Direction {
        match self {
            MessageType::TxnSignResponse | MessageType::FailedTxnSign => Direction::HostToWidget,
            MessageType::TxnSignRequest
            | MessageType::TxnSignRequestTimeout
            | MessageType::SwapSuccess => Direction::WidgetToHost,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_match_serde() {
        for t in MessageType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_string()));
            assert_eq!(MessageType::from_tag(t.as_str()), Some(t));
        }
        assert_eq!(MessageType::from_tag("txn_sign_request"), None);
    }
}
