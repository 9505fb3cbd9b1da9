//! Per-scheme resolver cache.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use url::Url;

use crate::cache::cell::{AddressCell, WaitError};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::observability::metrics;
use crate::resolver::{
    Listener, OptionsError, ResolutionOptions, ResolutionResult, ResolvedAddress, Resolver,
    ResolverContext, ResolverRegistry,
};
use crate::resolver::options::{DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};

/// Port used for resolved targets that do not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Default bound on how long a request waits for its scheme's address.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Values used to build [`ResolutionOptions`] for every new scheme, plus the
/// wait bound applied by callers.
#[derive(Clone)]
pub struct ResolutionDefaults {
    pub default_port: u16,
    pub initial_backoff: Duration,
    pub max_backoff: Option<Duration>,
    pub wait_timeout: Duration,
    pub context: Option<ResolverContext>,
}

impl Default for ResolutionDefaults {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: Some(DEFAULT_MAX_BACKOFF),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            context: None,
        }
    }
}

impl ResolutionDefaults {
    /// Options for a resolver bound to `address`.
    pub fn options_for(&self, address: Url) -> Result<ResolutionOptions, OptionsError> {
        ResolutionOptions::new(address, self.default_port)
            .with_initial_backoff(self.initial_backoff)?
            .with_max_backoff(self.max_backoff)
            .map(|o| o.with_context(self.context.clone()))
    }
}

impl fmt::Debug for ResolutionDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionDefaults")
            .field("default_port", &self.default_port)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}

/// A scheme's live resolver and the first address it produced.
pub struct CacheEntry {
    scheme: String,
    address: Url,
    cell: Arc<AddressCell>,
    // Owned for the cache's lifetime; never stopped or replaced.
    _resolver: Box<dyn Resolver>,
}

impl CacheEntry {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The options address the resolver was created with.
    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn cell(&self) -> &AddressCell {
        &self.cell
    }

    /// Wait for the first resolved address, at most `timeout`.
    pub async fn wait(&self, timeout: Duration) -> DiscoveryResult<ResolvedAddress> {
        let start = Instant::now();
        let result = self.cell.wait(timeout).await;
        metrics::record_wait(&self.scheme, start);

        result.map_err(|e| match e {
            WaitError::Failed(status) => DiscoveryError::Resolution {
                scheme: self.scheme.clone(),
                status,
            },
            WaitError::TimedOut => DiscoveryError::Timeout {
                scheme: self.scheme.clone(),
                timeout,
            },
        })
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("scheme", &self.scheme)
            .field("address", &self.address.as_str())
            .field("state", &self.cell.state())
            .finish()
    }
}

/// A scheme's place in the map. Inserted under the map's shard lock, filled
/// outside it so factory and resolver code never runs with a shard locked.
#[derive(Default)]
struct Slot {
    init: Mutex<()>,
    entry: OnceLock<Arc<CacheEntry>>,
}

/// Lazily populated map of scheme → [`CacheEntry`].
///
/// Entries are created at most once per scheme, even under concurrent
/// first-time lookups, and are never evicted.
pub struct AddressCache {
    registry: Arc<ResolverRegistry>,
    defaults: ResolutionDefaults,
    entries: DashMap<String, Arc<Slot>>,
}

impl AddressCache {
    pub fn new(registry: Arc<ResolverRegistry>, defaults: ResolutionDefaults) -> Self {
        Self {
            registry,
            defaults,
            entries: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> &ResolutionDefaults {
        &self.defaults
    }

    /// Return the entry for `scheme`, creating and starting its resolver on
    /// first use. `config_path` only matters for that first call.
    ///
    /// Concurrent first calls for one scheme serialize on that scheme's slot;
    /// other schemes are not blocked. A resolver's `start` may look up other
    /// schemes but must not create the entry for its own.
    pub fn get_or_create(&self, scheme: &str, config_path: &str) -> DiscoveryResult<Arc<CacheEntry>> {
        loop {
            if let Some(entry) = self.get(scheme) {
                return Ok(entry);
            }

            let slot = self.entries.entry(scheme.to_string()).or_default().value().clone();
            let _init = slot.init.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = slot.entry.get() {
                return Ok(entry.clone());
            }
            // A failed creation may have dropped this slot while we waited.
            if !self
                .entries
                .get(scheme)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &slot))
            {
                continue;
            }

            return match self.create_entry(scheme, config_path) {
                Ok(entry) => {
                    let _ = slot.entry.set(entry.clone());
                    Ok(entry)
                }
                Err(e) => {
                    self.entries
                        .remove_if(scheme, |_, s| Arc::ptr_eq(s, &slot) && s.entry.get().is_none());
                    Err(e)
                }
            };
        }
    }

    pub fn get(&self, scheme: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .get(scheme)
            .and_then(|slot| slot.entry.get().cloned())
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.get(scheme).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| slot.entry.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create_entry(&self, scheme: &str, config_path: &str) -> DiscoveryResult<Arc<CacheEntry>> {
        let raw = format!("{}:///{}", scheme, config_path);
        let address = Url::parse(&raw).map_err(|e| DiscoveryError::InvalidTarget {
            target: raw.clone(),
            reason: e.to_string(),
        })?;

        let options = self
            .defaults
            .options_for(address.clone())
            .map_err(|e| DiscoveryError::InvalidTarget {
                target: raw.clone(),
                reason: e.to_string(),
            })?;

        let resolver = self
            .registry
            .create_resolver(scheme, options)
            .ok_or_else(|| DiscoveryError::UnknownScheme(scheme.to_string()))?;

        metrics::record_resolver_created(scheme);
        tracing::info!(scheme = %scheme, address = %address, "Resolver created");

        let cell = Arc::new(AddressCell::new());
        resolver.start(listener_for(scheme.to_string(), cell.clone()));

        Ok(Arc::new(CacheEntry {
            scheme: scheme.to_string(),
            address,
            cell,
            _resolver: resolver,
        }))
    }
}

impl fmt::Debug for AddressCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressCache")
            .field("registry", &self.registry)
            .field("defaults", &self.defaults)
            .field("entries", &self.len())
            .finish()
    }
}

/// Listener that feeds a resolver's results into `cell`.
fn listener_for(scheme: String, cell: Arc<AddressCell>) -> Listener {
    Arc::new(move |result: ResolutionResult| match result {
        ResolutionResult::Success(addresses) => match addresses.into_iter().next() {
            Some(first) => {
                let endpoint = first.endpoint.clone();
                metrics::record_result(&scheme, "success");
                if cell.set_address(first) {
                    tracing::info!(scheme = %scheme, endpoint = %endpoint, "Address resolved");
                } else {
                    tracing::debug!(scheme = %scheme, endpoint = %endpoint, "Ignoring update, address already resolved");
                }
            }
            None => {
                metrics::record_result(&scheme, "empty");
                tracing::debug!(scheme = %scheme, "Resolver returned no addresses");
            }
        },
        ResolutionResult::Failure(status) => {
            metrics::record_result(&scheme, "failure");
            tracing::warn!(scheme = %scheme, code = %status.code, error = %status.message, "Resolution failed");
            cell.set_failure(status);
        }
    })
}
