//! Resolver contract and registry.
//!
//! # Data Flow
//! ```text
//! scheme name + ResolutionOptions
//!     → registry.rs (first factory whose name matches)
//!     → ResolverFactory::create(options)
//!     → Resolver::start(listener)
//!     → listener(ResolutionResult), zero or more times, from any thread
//! ```
//!
//! # Design Decisions
//! - Factories and resolvers are trait objects; dispatch is by name only
//! - Resolvers never surface setup errors from `start`; they publish a
//!   `Failure` result built with `status::status_from_error` instead
//! - Resolvers may publish repeatedly (e.g. on config reload)

pub mod address;
pub mod options;
pub mod registry;
pub mod status;

use std::sync::Arc;

pub use address::{AttributeKey, Attributes, Endpoint, ResolvedAddress, HOST_OVERRIDE};
pub use options::{OptionsError, ResolutionOptions, ResolverContext};
pub use registry::ResolverRegistry;
pub use status::{error_chain_message, status_from_error, Status, StatusCode};

/// Outcome of one resolution attempt.
#[derive(Debug, Clone)]
pub enum ResolutionResult {
    /// Addresses in resolver preference order. Usually non-empty.
    Success(Vec<ResolvedAddress>),
    Failure(Status),
}

impl ResolutionResult {
    pub fn success(addresses: Vec<ResolvedAddress>) -> Self {
        ResolutionResult::Success(addresses)
    }

    pub fn failure(status: Status) -> Self {
        ResolutionResult::Failure(status)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success(_))
    }
}

/// Callback receiving a resolver's results.
pub type Listener = Arc<dyn Fn(ResolutionResult) + Send + Sync>;

/// A running resolution strategy bound to one set of options.
pub trait Resolver: Send + Sync {
    /// Begin resolving. Must return promptly; results arrive via `listener`.
    ///
    /// Runs while the cache holds this scheme's creation lock: looking up
    /// other schemes is fine, creating this scheme's entry again deadlocks.
    fn start(&self, listener: Listener);
}

/// Creates resolvers for one scheme.
pub trait ResolverFactory: Send + Sync {
    /// Scheme this factory handles, e.g. `"config"` or `"dns"`.
    fn name(&self) -> &str;

    fn create(&self, options: ResolutionOptions) -> Box<dyn Resolver>;
}
