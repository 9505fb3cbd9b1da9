//! Resilience helpers for resolver implementations.
//!
//! # Design Decisions
//! - The registry, cache and interceptor never retry or back off
//! - Concrete resolvers use backoff.rs to pace reconnect attempts, honoring
//!   `ResolutionOptions::initial_backoff` / `max_backoff`

pub mod backoff;
