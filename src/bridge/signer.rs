//! The wallet signing capability.

use async_trait::async_trait;
use thiserror::Error;

use crate::algorand::Transaction;

/// Why a signer did not produce signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The user declined in the wallet.
    #[error("declined: {0}")]
    Declined(String),

    /// No wallet session is available.
    #[error("wallet disconnected")]
    Disconnected,

    #[error("{0}")]
    Other(String),
}

/// Signs groups of unsigned transactions.
///
/// Implementations return one signed transaction per input transaction, in
/// the flattened order of `groups`.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign(&self, groups: Vec<Vec<Transaction>>) -> Result<Vec<Vec<u8>>, SignerError>;

    /// Whether a session is currently available. Checked before each request.
    fn is_connected(&self) -> bool {
        true
    }
}
