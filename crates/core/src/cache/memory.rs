//! In-memory cache backend.
//!
//! Uses a tokio RwLock over an ordered list of generations. Suitable for
//! tests and for hosts without persistent storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::RequestKey;
use super::store::{CacheStorage, GenerationName, GenerationSummary};
use crate::Error;
use crate::request::StoredResponse;

#[derive(Debug, Default)]
struct Generation {
    name: String,
    entries: HashMap<String, (String, StoredResponse)>,
}

/// Volatile [`CacheStorage`] backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<Vec<Generation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStore {
    async fn open(&self, generation: &GenerationName) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        if !generations.iter().any(|g| g.name == generation.as_str()) {
            generations.push(Generation { name: generation.to_string(), entries: HashMap::new() });
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.iter().map(|g| g.name.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != generation);
        Ok(generations.len() < before)
    }

    async fn get(&self, generation: &GenerationName, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let generations = self.generations.read().await;
        Ok(generations
            .iter()
            .find(|g| g.name == generation.as_str())
            .and_then(|g| g.entries.get(key.hash()))
            .map(|(_, response)| response.clone()))
    }

    async fn put(
        &self, generation: &GenerationName, key: &RequestKey, response: &StoredResponse,
    ) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let target = generations
            .iter_mut()
            .find(|g| g.name == generation.as_str())
            .ok_or_else(|| Error::StoreWriteFailed(format!("generation {generation} does not exist")))?;
        target
            .entries
            .insert(key.hash().to_string(), (key.url().to_string(), response.clone()));
        Ok(())
    }

    async fn entries(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        let mut urls: Vec<String> = generations
            .iter()
            .find(|g| g.name == generation)
            .map(|g| g.entries.values().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default();
        urls.sort();
        Ok(urls)
    }

    async fn summary(&self, generation: &str) -> Result<Option<GenerationSummary>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.iter().find(|g| g.name == generation).map(|g| GenerationSummary {
            name: g.name.clone(),
            entries: g.entries.len() as u64,
            bytes: g.entries.values().map(|(_, r)| r.body.len() as u64).sum(),
        }))
    }
}
