//! Generation lifecycle: prepare the target generation at install, promote it
//! at activation, and purge every other generation.

use tokio::sync::RwLock;

use swcache_core::cache::{CacheHandle, CacheStore, GenerationName};
use swcache_core::{Error, RequestKey, StoredResponse};

/// Tracks which generation is current for one worker instance.
#[derive(Debug)]
pub struct GenerationManager {
    store: CacheStore,
    target: GenerationName,
    current: RwLock<Option<GenerationName>>,
}

impl GenerationManager {
    pub fn new(store: CacheStore, target: GenerationName) -> Self {
        Self { store, target, current: RwLock::new(None) }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Open the target generation for population.
    pub async fn prepare(&self) -> Result<CacheHandle, Error> {
        self.store.open(&self.target).await
    }

    /// Promote the target generation and delete every other one.
    ///
    /// The target is made current before superseded generations are deleted,
    /// so lookups never observe a window without a current generation.
    ///
    /// Returns the names of the generations that were deleted.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.store.open(&self.target).await?;
        *self.current.write().await = Some(self.target.clone());

        let purged = self.purge_superseded().await?;
        tracing::info!(generation = %self.target, purged = purged.len(), "generation activated");
        Ok(purged)
    }

    /// Delete every generation other than the current one.
    ///
    /// Does nothing while no generation is current. Individual delete
    /// failures are logged and skipped.
    pub async fn purge_superseded(&self) -> Result<Vec<String>, Error> {
        let Some(current) = self.current().await else {
            return Ok(Vec::new());
        };

        let mut purged = Vec::new();
        for name in self.store.keys().await? {
            if name == current.as_str() {
                continue;
            }
            match self.store.delete(&name).await {
                Ok(true) => {
                    tracing::info!(generation = %name, "purged superseded generation");
                    purged.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(generation = %name, error = %e, "failed to purge generation"),
            }
        }
        Ok(purged)
    }

    /// Mark the target current without touching the store.
    ///
    /// Used when the store is failing so activation still completes.
    pub async fn claim(&self) {
        *self.current.write().await = Some(self.target.clone());
    }

    pub async fn current(&self) -> Option<GenerationName> {
        self.current.read().await.clone()
    }

    pub async fn current_handle(&self) -> Option<CacheHandle> {
        self.current.read().await.as_ref().map(|g| self.store.handle(g))
    }

    /// Look up a key in the current generation only.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        match self.current_handle().await {
            Some(handle) => handle.get(key).await,
            None => Ok(None),
        }
    }
}
