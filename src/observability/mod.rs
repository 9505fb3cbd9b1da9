//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / cache / interceptor / resolvers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Scheme is the main label; virtual paths are logged, never used as labels
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
