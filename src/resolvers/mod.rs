//! Bundled resolver implementations.
//!
//! # Schemes
//! - `config` (config.rs): addresses read from the TOML configuration,
//!   re-published on hot reload
//! - `dns` (dns.rs): system name lookup, retried with reconnect backoff,
//!   tags every address with a `HostOverride`

pub mod config;
pub mod dns;

use std::sync::Arc;

use crate::config::ConfigSource;
use crate::resolver::ResolverRegistry;

pub use config::{ConfigResolverFactory, CONFIG_SCHEME};
pub use dns::{DnsResolverFactory, DNS_SCHEME};

/// Registry with the bundled `config` and `dns` factories, in that order.
pub fn default_registry(source: ConfigSource) -> ResolverRegistry {
    ResolverRegistry::default()
        .with_factory(Arc::new(ConfigResolverFactory::new(source)))
        .with_factory(Arc::new(DnsResolverFactory::new()))
}
