//! Virtual address discovery for outbound HTTP requests.
//!
//! Callers address logical services with URIs such as
//! `config:///addresses:backend/api/product/1`; a pluggable resolver picked by
//! the scheme maps `addresses:backend` to a concrete host and port, and the
//! request is rewritten to `https://host:port/api/product/1` before it reaches
//! the transport.
//!
//! ```text
//!  VirtualRequest ──▶ interceptor ──▶ cache ──▶ resolver registry ──▶ ResolverFactory
//!                        │             ▲                                   │
//!                        │             └──── first address ◀── Resolver ◀──┘
//!                        ▼
//!                  http::Request (rewritten) ──▶ transport (any tower Service)
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod observability;
pub mod resilience;
pub mod resolver;
pub mod resolvers;

pub use cache::{AddressCache, ResolutionDefaults};
pub use config::DiscoveryConfig;
pub use error::{BoxError, DiscoveryError};
pub use interceptor::{DiscoveryLayer, DiscoveryService, VirtualRequest};
pub use resolver::{ResolutionOptions, ResolutionResult, ResolvedAddress, Resolver, ResolverFactory, ResolverRegistry};
