//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse typed sections + keep raw document)
//!     → validation.rs (semantic checks)
//!     → DiscoveryConfig (validated, immutable)
//!     → source.rs (ArcSwap, shared with the config resolver)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → source.rs atomic swap + generation bump
//!     → config resolvers re-publish addresses
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A reload that fails validation keeps the current configuration

pub mod loader;
pub mod schema;
pub mod source;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DiscoveryConfig, ObservabilityConfig, ResolutionConfig};
pub use source::ConfigSource;
pub use watcher::ConfigWatcher;
