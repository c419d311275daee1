//! Host-side toolkit for embedding the Pera swap widget.
//!
//! The widget runs in an iframe and can delegate transaction signing to the
//! embedding page. This crate builds the widget URL, answers the widget's
//! cross-document messages through a pluggable wallet signer, and talks to
//! the Quote Service the widget itself uses.

pub mod algorand;
pub mod bridge;
pub mod config;
pub mod observability;
pub mod protocol;
pub mod quote;
pub mod widget;

pub use bridge::{
    LocalWindow, OriginPolicy, Registration, SigningCoordinator, WalletSigner, WidgetController,
    WidgetHandlers,
};
pub use config::HostConfig;
pub use widget::{generate_widget_url, WidgetConfig};
