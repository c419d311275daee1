//! Widget URL and iframe builder.
//!
//! # Data Flow
//! ```text
//! WidgetConfig (immutable, validated)
//!     → url.rs (fixed key table → query string on the widget base URL)
//!     → iframe.rs (src + layout defaults → <iframe> markup)
//! ```
//!
//! # Design Decisions
//! - Pure functions: the same config always yields the same URL
//! - `useParentSigner` without an account address is an error, not a
//!   silently dropped parameter

pub mod iframe;
pub mod types;
pub mod url;

pub use iframe::{IframeOptions, WidgetIframe};
pub use types::{AssetId, SearchParamKey, WidgetAppTheme, WidgetConfig, WidgetError, WidgetNetwork};
pub use self::url::{generate_widget_url, generate_widget_url_with_base, DEFAULT_WIDGET_URL};
