//! Request interceptor subsystem.
//!
//! # Data Flow
//! ```text
//! VirtualRequest (scheme:///configPath/requestPath?query)
//!     → target.rs (split scheme / configPath / requestPath / query)
//!     → cache (get or create the scheme's entry, wait for its address)
//!     → target.rs (rewrite to https://host:port/requestPath?query,
//!                  Host header from HostOverride)
//!     → inner transport service
//!     → response or transport error, untouched
//! ```
//!
//! # Design Decisions
//! - Exposed as a tower Layer/Service pair so any transport can sit underneath
//! - No retries; unknown schemes fail before the transport is called
//! - Waits only suspend the calling request

pub mod layer;
pub mod target;

pub use layer::{DiscoveryLayer, DiscoveryService};
pub use target::{VirtualRequest, VirtualTarget, SECURE_SCHEME};
