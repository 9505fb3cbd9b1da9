//! Resolver backed by the system's name resolution.
//!
//! `dns:///api.example.com:8443` looks up `api.example.com` and publishes one
//! address per returned socket address, each carrying the looked-up name as
//! its `HostOverride` so the backend still sees the logical host. IP literal
//! targets carry no override.
//!
//! Failed lookups are published and retried with the options' reconnect
//! backoff until one succeeds.

use std::net::{IpAddr, SocketAddr};
use std::num::ParseIntError;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::resilience::backoff::Backoff;
use crate::resolver::{
    status_from_error, Attributes, Endpoint, Listener, ResolutionOptions, ResolutionResult,
    ResolvedAddress, Resolver, ResolverFactory, StatusCode, HOST_OVERRIDE,
};

/// Scheme handled by [`DnsResolverFactory`].
pub const DNS_SCHEME: &str = "dns";

/// Problems with a `dns:///` target or its lookup.
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("DNS target has an empty host")]
    EmptyHost,

    #[error("DNS target '{target}' has an invalid port")]
    InvalidPort {
        target: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Lookup of '{host}' returned no addresses")]
    NoAddresses { host: String },
}

/// Split `host[:port]` (or `[v6]:port`), falling back to `default_port`.
pub fn parse_target(target: &str, default_port: u16) -> Result<(String, u16), DnsError> {
    let invalid_port = |source| DnsError::InvalidPort {
        target: target.to_string(),
        source,
    };

    let (host, port) = if let Some(rest) = target.strip_prefix('[') {
        match rest.split_once(']') {
            Some((host, "")) => (host, default_port),
            Some((host, port)) => {
                let port = port.strip_prefix(':').unwrap_or(port);
                (host, port.parse().map_err(invalid_port)?)
            }
            None => (target, default_port),
        }
    } else {
        match target.rsplit_once(':') {
            // More than one colon without brackets: a bare IPv6 literal.
            Some((host, _)) if host.contains(':') => (target, default_port),
            Some((host, port)) => (host, port.parse().map_err(invalid_port)?),
            None => (target, default_port),
        }
    };

    if host.is_empty() {
        return Err(DnsError::EmptyHost);
    }
    Ok((host.to_string(), port))
}

// IP literals need no override: the endpoint already is the host.
fn to_addresses(host: &str, addrs: impl Iterator<Item = SocketAddr>) -> Vec<ResolvedAddress> {
    let is_literal = host.parse::<IpAddr>().is_ok();
    addrs
        .map(|sa| {
            let endpoint = Endpoint::new(sa.ip().to_string(), sa.port());
            if is_literal {
                ResolvedAddress::with_attributes(endpoint, Attributes::new())
            } else {
                ResolvedAddress::with_attributes(
                    endpoint,
                    Attributes::new().with(HOST_OVERRIDE, host.to_string()),
                )
            }
        })
        .collect()
}

/// Creates [`DnsResolver`]s.
#[derive(Debug, Clone, Default)]
pub struct DnsResolverFactory;

impl DnsResolverFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ResolverFactory for DnsResolverFactory {
    fn name(&self) -> &str {
        DNS_SCHEME
    }

    fn create(&self, options: ResolutionOptions) -> Box<dyn Resolver> {
        Box::new(DnsResolver {
            target: options.address().path().trim_start_matches('/').to_string(),
            default_port: options.default_port(),
            initial_backoff: options.initial_backoff(),
            max_backoff: options.max_backoff(),
            task: Mutex::new(None),
        })
    }
}

/// Looks up one host name, retrying with backoff until it succeeds.
pub struct DnsResolver {
    target: String,
    default_port: u16,
    initial_backoff: Duration,
    max_backoff: Option<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Resolver for DnsResolver {
    fn start(&self, listener: Listener) {
        let (host, port) = match parse_target(&self.target, self.default_port) {
            Ok(parsed) => parsed,
            Err(e) => {
                listener(ResolutionResult::Failure(status_from_error(
                    "Resolve failed",
                    e,
                    Some(StatusCode::InvalidArgument),
                )));
                return;
            }
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                listener(ResolutionResult::Failure(status_from_error(
                    "Resolve failed",
                    e,
                    Some(StatusCode::Unavailable),
                )));
                return;
            }
        };

        let mut backoff = Backoff::new(self.initial_backoff, self.max_backoff);
        let task = handle.spawn(async move {
            loop {
                let error = match tokio::net::lookup_host((host.as_str(), port)).await {
                    Ok(addrs) => {
                        let addresses = to_addresses(&host, addrs);
                        if !addresses.is_empty() {
                            tracing::debug!(host = %host, count = addresses.len(), "DNS lookup complete");
                            listener(ResolutionResult::Success(addresses));
                            return;
                        }
                        status_from_error(
                            "Resolve failed",
                            DnsError::NoAddresses { host: host.clone() },
                            Some(StatusCode::Unavailable),
                        )
                    }
                    Err(e) => status_from_error("Resolve failed", e, Some(StatusCode::Unavailable)),
                };

                listener(ResolutionResult::Failure(error));
                let delay = backoff.next_delay();
                tracing::warn!(host = %host, attempt = backoff.attempts(), delay = ?delay, "DNS lookup failed, retrying");
                tokio::time::sleep(delay).await;
            }
        });

        if let Ok(mut slot) = self.task.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
    }
}

impl Drop for DnsResolver {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}
