//! Sign flow failures.

use thiserror::Error;

use crate::algorand::DecodeError;
use crate::bridge::signer::SignerError;
use crate::protocol::{ErrorCode, ErrorInfo};

/// Terminal failure of one sign request.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("transaction {index} of group {group} could not be decoded: {source}")]
    Decode {
        group: usize,
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("malformed sign request: {0}")]
    MalformedRequest(String),

    #[error("signer rejected the request: {0}")]
    SignerRejected(String),

    #[error("no signer connected")]
    NotConnected,

    #[error("signer returned {actual} signed transactions for {expected} requested")]
    ResultMismatch { expected: usize, actual: usize },
}

impl SignError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SignError::Decode { .. } | SignError::MalformedRequest(_) => ErrorCode::DecodeError,
            SignError::SignerRejected(_) => ErrorCode::SignerRejected,
            SignError::NotConnected => ErrorCode::NotConnected,
            SignError::ResultMismatch { .. } => ErrorCode::ResultMismatch,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.to_string())
    }
}

impl From<SignerError> for SignError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Disconnected => SignError::NotConnected,
            SignerError::Declined(reason) => SignError::SignerRejected(reason),
            SignerError::Other(reason) => SignError::SignerRejected(reason),
        }
    }
}
