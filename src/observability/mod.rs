//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! bridge, coordinator, quote client produce:
//!     → logging.rs (structured log events, flow id spans)
//!     → metrics.rs (counters, gauges, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stderr (pretty or JSON), keeping stdout for CLI output
//!     → whichever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every sign flow runs inside a span carrying its flow id and request id
//! - The library never installs a metrics exporter; without a recorder the
//!   macros are no-ops

pub mod logging;
pub mod metrics;
