//! Live, swappable configuration shared with resolvers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::config::schema::DiscoveryConfig;

/// Current configuration plus a change signal.
///
/// Readers take cheap snapshots with [`load`](Self::load); every
/// [`store`](Self::store) bumps a generation counter that subscribers can
/// await.
#[derive(Clone)]
pub struct ConfigSource {
    current: Arc<ArcSwap<DiscoveryConfig>>,
    generation: Arc<watch::Sender<u64>>,
}

impl ConfigSource {
    pub fn new(config: DiscoveryConfig) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            generation: Arc::new(tx),
        }
    }

    /// Snapshot of the current configuration.
    pub fn load(&self) -> Arc<DiscoveryConfig> {
        self.current.load_full()
    }

    /// Atomically replace the configuration and notify subscribers.
    pub fn store(&self, config: DiscoveryConfig) {
        self.current.store(Arc::new(config));
        self.generation.send_modify(|g| *g += 1);
        tracing::info!(generation = *self.generation.borrow(), "Configuration swapped");
    }

    /// Receiver that changes on every [`store`](Self::store).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }
}

impl std::fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSource")
            .field("generation", &self.generation())
            .finish()
    }
}
