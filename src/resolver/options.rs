//! Options handed to a resolver when it is created.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default delay before a resolver's first reconnect attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Default upper bound on a resolver's reconnect delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Rejected option values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("Initial reconnect backoff must be greater than zero.")]
    InitialBackoff,

    #[error("Maximum reconnect backoff must be greater than zero.")]
    MaxBackoff,
}

/// Opaque value threaded from the interceptor to every resolver it creates.
pub type ResolverContext = Arc<dyn Any + Send + Sync>;

/// Immutable parameter bundle given to [`ResolverFactory::create`].
///
/// Backoff values are checked when they are assigned, so a constructed
/// `ResolutionOptions` always holds strictly positive durations.
///
/// [`ResolverFactory::create`]: crate::resolver::ResolverFactory::create
#[derive(Clone)]
pub struct ResolutionOptions {
    address: Url,
    default_port: u16,
    initial_backoff: Duration,
    max_backoff: Option<Duration>,
    context: Option<ResolverContext>,
}

impl ResolutionOptions {
    pub fn new(address: Url, default_port: u16) -> Self {
        Self {
            address,
            default_port,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: Some(DEFAULT_MAX_BACKOFF),
            context: None,
        }
    }

    /// The `scheme:///configPath` address the resolver is bound to.
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Port used when the resolved target does not name one.
    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// Delay between the first and second connection attempts.
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Upper bound on the reconnect delay; `None` means unbounded.
    pub fn max_backoff(&self) -> Option<Duration> {
        self.max_backoff
    }

    pub fn set_initial_backoff(&mut self, backoff: Duration) -> Result<(), OptionsError> {
        if backoff.is_zero() {
            return Err(OptionsError::InitialBackoff);
        }
        self.initial_backoff = backoff;
        Ok(())
    }

    pub fn set_max_backoff(&mut self, backoff: Option<Duration>) -> Result<(), OptionsError> {
        if backoff.is_some_and(|b| b.is_zero()) {
            return Err(OptionsError::MaxBackoff);
        }
        self.max_backoff = backoff;
        Ok(())
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Result<Self, OptionsError> {
        self.set_initial_backoff(backoff)?;
        Ok(self)
    }

    pub fn with_max_backoff(mut self, backoff: Option<Duration>) -> Result<Self, OptionsError> {
        self.set_max_backoff(backoff)?;
        Ok(self)
    }

    pub fn with_context(mut self, context: Option<ResolverContext>) -> Self {
        self.context = context;
        self
    }

    /// The raw context handle.
    pub fn context(&self) -> Option<&ResolverContext> {
        self.context.as_ref()
    }

    /// The context handle downcast to `T`, if it holds one.
    pub fn context_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref::<T>())
    }
}

impl fmt::Debug for ResolutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionOptions")
            .field("address", &self.address.as_str())
            .field("default_port", &self.default_port)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("context", &self.context.is_some())
            .finish()
    }
}
