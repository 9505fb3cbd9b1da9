//! Address cache subsystem.
//!
//! # Data Flow
//! ```text
//! interceptor asks for scheme S
//!     → store.rs: entry for S exists? return it
//!     → otherwise (atomically per S, under S's slot lock, no shard lock held):
//!         build ResolutionOptions (S:///configPath, defaults)
//!         → ResolverRegistry::create_resolver(S)
//!         → Resolver::start(listener → cell.rs)
//!         → insert entry
//!     → caller waits on the entry's AddressCell (no map lock held)
//! ```
//!
//! # Design Decisions
//! - One resolver per scheme for the lifetime of the cache
//! - Only the first non-empty success is ever published to callers
//! - Failures unblock pending callers instead of leaving them hanging
//! - Every wait is bounded

pub mod cell;
pub mod store;

pub use cell::{AddressCell, CellState};
pub use store::{AddressCache, CacheEntry, ResolutionDefaults, DEFAULT_PORT, DEFAULT_WAIT_TIMEOUT};
