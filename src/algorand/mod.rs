//! Algorand transaction codec.
//!
//! # Data Flow
//! ```text
//! TXN_SIGN_REQUEST bytes (msgpack)
//!     → transaction.rs (decode into a structured Transaction, keep raw bytes)
//!     → address.rs (32-byte keys ⇄ base32 + checksum strings)
//!     → Wallet Signer receives Vec<Vec<Transaction>>
//! ```
//!
//! # Design Decisions
//! - Decoding is strict about shape (map, string keys, field types) but
//!   tolerant of omitted zero-valued fields, as canonical encoding drops them
//! - The original bytes travel with the decoded view so signers sign exactly
//!   what the widget produced

pub mod address;
pub mod transaction;

pub use address::{Address, AddressError};
pub use transaction::{DecodeError, Transaction, TxnType};
