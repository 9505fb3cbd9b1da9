//! Errors surfaced to callers of the discovery interceptor.

use std::time::Duration;

use thiserror::Error;

use crate::resolver::Status;

/// Boxed transport error, as returned by most tower services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving and forwarding a virtual request.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The target is not a `scheme:///key/path` virtual URI.
    #[error("Invalid virtual address '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// No registered factory handles the scheme.
    #[error("Couldn't create a resolver for the scheme '{0}'.")]
    UnknownScheme(String),

    /// The resolver reported a failure before producing any address.
    #[error("Resolution failed for scheme '{scheme}': {status}")]
    Resolution { scheme: String, status: Status },

    /// No address arrived within the configured wait.
    #[error("Timed out after {timeout:?} waiting for an address for scheme '{scheme}'")]
    Timeout { scheme: String, timeout: Duration },

    /// The rewritten URI could not be assembled into a request.
    #[error("Failed to build rewritten request: {0}")]
    Rewrite(#[from] http::Error),

    /// The underlying transport failed; passed through untouched.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),
}

impl DiscoveryError {
    /// True for failures raised before any transport call was attempted.
    pub fn is_routing(&self) -> bool {
        !matches!(self, DiscoveryError::Transport(_))
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
