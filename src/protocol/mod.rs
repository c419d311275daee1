//! Cross-document message protocol.
//!
//! # Data Flow
//! ```text
//! raw JSON posted by the widget
//!     → envelope.rs (classify: ignore foreign traffic, route by `type`)
//!     → Inbound (typed payloads: SignRequest, TimeoutNotice, SwapResult)
//!
//! Outbound (SignResponse / FailedSign)
//!     → envelope.rs (to_wire)
//!     → {"type": T, "message": {"type": T, ...}}
//! ```
//!
//! # Design Decisions
//! - Classification never fails: anything that is not a well-formed envelope
//!   is `None` so ambient `postMessage` traffic on the same channel is ignored
//! - Unknown tags classify as `Inbound::Unknown` and degrade to a no-op
//! - Transaction bytes travel as base64 strings (bytes.rs)

pub mod bytes;
pub mod envelope;
pub mod message;

pub use bytes::WireBytes;
pub use envelope::{
    classify, ErrorCode, ErrorInfo, Inbound, Outbound, RequestId, SignRequest, SwapResult,
    TimeoutNotice,
};
pub use message::{Direction, MessageType};
