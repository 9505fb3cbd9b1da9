//! Scheme → factory dispatch.
//!
//! # Design Decisions
//! - Linear scan in registration order; first name match wins
//! - Duplicate names are not rejected, later ones are simply unreachable

use std::fmt;
use std::sync::Arc;

use crate::resolver::{ResolutionOptions, Resolver, ResolverFactory};

/// Ordered collection of resolver factories.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    factories: Vec<Arc<dyn ResolverFactory>>,
}

impl ResolverRegistry {
    pub fn new(factories: Vec<Arc<dyn ResolverFactory>>) -> Self {
        Self { factories }
    }

    /// Append a factory. Registration order decides precedence.
    pub fn register(&mut self, factory: Arc<dyn ResolverFactory>) {
        tracing::debug!(scheme = %factory.name(), "Resolver factory registered");
        self.factories.push(factory);
    }

    pub fn with_factory(mut self, factory: Arc<dyn ResolverFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Create a resolver for `scheme`, or `None` if no factory handles it.
    pub fn create_resolver(
        &self,
        scheme: &str,
        options: ResolutionOptions,
    ) -> Option<Box<dyn Resolver>> {
        self.factories
            .iter()
            .find(|f| f.name() == scheme)
            .map(|f| f.create(options))
    }

    /// Registered scheme names in registration order.
    pub fn schemes(&self) -> Vec<String> {
        self.factories.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
