//! Resolver reading addresses from the loaded configuration document.
//!
//! `config:///addresses:backend` resolves the `[addresses.backend]` table:
//!
//! ```toml
//! [addresses.backend]
//! host = "10.0.0.7"
//! port = 8443                    # optional, defaults to the options' default port
//! host_override = "api.internal" # optional
//! ```
//!
//! A section may also be an array of such tables (`[[addresses.pool]]`).
//! Addresses are published on start and again after every configuration swap.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{ConfigSource, DiscoveryConfig};
use crate::resolver::{
    status_from_error, Attributes, Endpoint, Listener, ResolutionOptions, ResolutionResult,
    ResolvedAddress, Resolver, ResolverFactory, StatusCode, HOST_OVERRIDE,
};

/// Scheme handled by [`ConfigResolverFactory`].
pub const CONFIG_SCHEME: &str = "config";

/// Why a configuration section could not be turned into addresses.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Section '{0}' not found")]
    MissingSection(String),

    #[error("Section '{path}' must be a table or an array of tables")]
    InvalidShape { path: String },

    #[error("Section '{path}' has no 'host' string")]
    MissingHost { path: String },

    #[error("Section '{path}' has a non-integer port")]
    PortType { path: String },

    #[error("Section '{path}' has port {port} outside 1-65535")]
    PortRange { path: String, port: i64 },
}

impl LookupError {
    fn status_code(&self) -> StatusCode {
        match self {
            LookupError::MissingSection(_) => StatusCode::NotFound,
            _ => StatusCode::InvalidArgument,
        }
    }
}

/// Resolve the section at `path` into addresses.
pub fn resolve_section(
    config: &DiscoveryConfig,
    path: &str,
    default_port: u16,
) -> Result<Vec<ResolvedAddress>, LookupError> {
    let value = config
        .lookup(path)
        .ok_or_else(|| LookupError::MissingSection(path.to_string()))?;

    match value {
        toml::Value::Table(table) => Ok(vec![address_from_table(table, path, default_port)?]),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::Table(table) => address_from_table(table, path, default_port),
                _ => Err(LookupError::InvalidShape { path: path.to_string() }),
            })
            .collect(),
        _ => Err(LookupError::InvalidShape { path: path.to_string() }),
    }
}

fn address_from_table(
    table: &toml::Table,
    path: &str,
    default_port: u16,
) -> Result<ResolvedAddress, LookupError> {
    let host = table
        .get("host")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LookupError::MissingHost { path: path.to_string() })?;

    let port = match table.get("port") {
        None => default_port,
        Some(toml::Value::Integer(port)) => u16::try_from(*port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| LookupError::PortRange {
                path: path.to_string(),
                port: *port,
            })?,
        Some(_) => return Err(LookupError::PortType { path: path.to_string() }),
    };

    let mut attributes = Attributes::new();
    if let Some(host_override) = table.get("host_override").and_then(|v| v.as_str()) {
        attributes.insert(HOST_OVERRIDE, host_override.to_string());
    }

    Ok(ResolvedAddress::with_attributes(Endpoint::new(host, port), attributes))
}

/// Creates [`ConfigResolver`]s over a shared [`ConfigSource`].
#[derive(Debug, Clone)]
pub struct ConfigResolverFactory {
    source: ConfigSource,
}

impl ConfigResolverFactory {
    pub fn new(source: ConfigSource) -> Self {
        Self { source }
    }
}

impl ResolverFactory for ConfigResolverFactory {
    fn name(&self) -> &str {
        CONFIG_SCHEME
    }

    fn create(&self, options: ResolutionOptions) -> Box<dyn Resolver> {
        let path = options.address().path().trim_start_matches('/').to_string();
        Box::new(ConfigResolver {
            path,
            default_port: options.default_port(),
            source: self.source.clone(),
            reload_task: Mutex::new(None),
        })
    }
}

/// Publishes the addresses stored under one configuration key.
pub struct ConfigResolver {
    path: String,
    default_port: u16,
    source: ConfigSource,
    reload_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigResolver {
    fn publish(config: &DiscoveryConfig, path: &str, default_port: u16, listener: &Listener) {
        match resolve_section(config, path, default_port) {
            Ok(addresses) => {
                tracing::debug!(path = %path, count = addresses.len(), "Publishing config addresses");
                listener(ResolutionResult::Success(addresses));
            }
            Err(e) => {
                let code = e.status_code();
                listener(ResolutionResult::Failure(status_from_error("Resolve failed", e, Some(code))));
            }
        }
    }
}

impl Resolver for ConfigResolver {
    fn start(&self, listener: Listener) {
        Self::publish(&self.source.load(), &self.path, self.default_port, &listener);

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!(path = %self.path, "No runtime available, config reloads will not be published");
                return;
            }
        };

        let source = self.source.clone();
        let path = self.path.clone();
        let default_port = self.default_port;
        let mut changes = source.subscribe();
        let task = handle.spawn(async move {
            while changes.changed().await.is_ok() {
                Self::publish(&source.load(), &path, default_port, &listener);
            }
        });

        if let Ok(mut slot) = self.reload_task.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
    }
}

impl Drop for ConfigResolver {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.reload_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}
