//! Configuration schema definitions.
//!
//! The file has two kinds of content: the typed sections below, and free-form
//! tables that the `config` resolver reads addresses from, e.g.
//!
//! ```toml
//! [resolution]
//! default_port = 80
//!
//! [addresses.backend]
//! host = "localhost"
//! port = 80
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::ResolutionDefaults;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Defaults for resolvers and resolution waits.
    pub resolution: ResolutionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// The whole parsed document, used for `config:///a:b` lookups.
    #[serde(skip)]
    pub document: toml::Table,
}

impl DiscoveryConfig {
    /// Value at a `:`-separated key path, e.g. `addresses:backend`.
    pub fn lookup(&self, path: &str) -> Option<&toml::Value> {
        let mut segments = path.split(':');
        let first = segments.next()?;
        let mut current = self.document.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }
}

/// Resolution defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Port used when a resolved target does not name one.
    pub default_port: u16,

    /// Delay before a resolver's first reconnect attempt, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound on reconnect delay, in milliseconds.
    pub max_backoff_ms: Option<u64>,

    /// How long a request waits for its scheme's first address, in milliseconds.
    pub wait_timeout_ms: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            default_port: 80,
            initial_backoff_ms: 1_000,
            max_backoff_ms: Some(120_000),
            wait_timeout_ms: 30_000,
        }
    }
}

impl ResolutionConfig {
    /// Cache defaults built from this section. Assumes the section passed
    /// validation.
    pub fn to_defaults(&self) -> ResolutionDefaults {
        ResolutionDefaults {
            default_port: self.default_port,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: self.max_backoff_ms.map(Duration::from_millis),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            context: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
