//! Host side of the widget message bridge.
//!
//! # Data Flow
//! ```text
//! widget window ──post──▶ host MessageChannel
//!     → controller.rs (listener: classify, origin check, route)
//!     → coordinator.rs (decode batch, call WalletSigner in its own task)
//!     → controller.rs (post reply to the source window captured for that message)
//!     → widget window
//! ```
//!
//! # Design Decisions
//! - One listener binding per controller; re-registering replaces it
//! - `Registration` guards release the binding on drop, but only if they
//!   are still the current generation
//! - Listener closures hold a `Weak` controller reference, so a dropped
//!   controller never answers again
//! - Reply targets are derived per message, never cached
//! - The signer is injected, never global

pub mod controller;
pub mod coordinator;
pub mod error;
pub mod origin;
pub mod signer;
pub mod window;

pub use controller::{Registration, ReplyTarget, WidgetController, WidgetHandlers};
pub use coordinator::{FlowSnapshot, SigningCoordinator};
pub use error::SignError;
pub use origin::{normalize_origin, OriginError, OriginPolicy};
pub use signer::{SignerError, WalletSigner};
pub use window::{
    InboundMessage, Listener, ListenerId, LocalWindow, MessageChannel, MessageTarget,
    PostedMessage, WindowRef,
};
