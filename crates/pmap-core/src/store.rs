//! Snapshot store with atomic reload.
//!
//! Readers grab an `Arc` to the current snapshot under a short read lock and
//! work against it for as long as they like. A reload builds and validates
//! the replacement without holding the lock, then swaps the pointer.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::raw::RawPlatformMapping;
use crate::resolver::PortProfileResolver;
use crate::snapshot::MappingSnapshot;

/// Holds the active mapping snapshot.
#[derive(Debug)]
pub struct MappingStore {
    config: LoaderConfig,
    current: RwLock<Arc<MappingSnapshot>>,
}

impl MappingStore {
    /// Builds the first snapshot and publishes it as generation 1.
    pub fn new(raw: &RawPlatformMapping, config: LoaderConfig) -> Result<Self> {
        let mut snapshot = MappingSnapshot::build(raw, &config)?;
        snapshot.set_generation(1);
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns the active snapshot.
    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    /// Returns a resolver bound to the active snapshot.
    pub fn resolver(&self) -> PortProfileResolver {
        PortProfileResolver::new(self.snapshot())
    }

    /// Replaces the active snapshot, returning the new generation.
    ///
    /// On error the active snapshot is left untouched.
    #[instrument(skip(self, raw))]
    pub fn reload(&self, raw: &RawPlatformMapping) -> Result<u64> {
        let mut snapshot = match MappingSnapshot::build(raw, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, generation = self.generation(), "Reload rejected, keeping active mapping");
                return Err(e);
            }
        };

        let mut current = self.current.write();
        let generation = current.generation() + 1;
        snapshot.set_generation(generation);
        *current = Arc::new(snapshot);
        drop(current);

        info!(generation, "Platform mapping reloaded");
        Ok(generation)
    }
}
