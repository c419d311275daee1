//! Quote Service client.
//!
//! The widget prices swaps and builds transaction groups through this HTTP
//! API. Hosts use the same API to build custom swap UIs or to preview what
//! the widget will ask them to sign.

pub mod client;
pub mod types;

pub use client::{QuoteError, SwapApiClient};
pub use types::{
    AlgoPrice, Asset, AssetKind, CreateQuoteBody, GetAssetsResponse, GroupPurpose,
    PrepareTransactionsBody, PrepareTransactionsResponse, SwapProvider, SwapQuote,
    SwapTransactionGroup, SwapType, VerificationTier,
};
