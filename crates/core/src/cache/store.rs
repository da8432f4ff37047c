//! Backend-agnostic cache store.
//!
//! [`CacheStorage`] is the seam between the interceptor and a concrete
//! backend. [`CacheStore`] wraps a backend and hands out [`CacheHandle`]s
//! bound to a single generation. Handle writes never raise: a failed put is
//! logged and reported as `false`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::hash::RequestKey;
use crate::Error;
use crate::request::StoredResponse;

/// Name of a cache generation.
///
/// Must change whenever seeded resources or cached content changes so the
/// previous generation is purged rather than reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationName(String);

impl GenerationName {
    /// # Errors
    ///
    /// Returns `Error::InvalidGeneration` if the name is empty, contains
    /// whitespace, or exceeds 128 bytes.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidGeneration("name must not be empty".into()));
        }
        if name.len() > 128 {
            return Err(Error::InvalidGeneration(format!("{name}: longer than 128 bytes")));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidGeneration(format!("{name:?}: must not contain whitespace")));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GenerationName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GenerationName> for String {
    fn from(value: GenerationName) -> Self {
        value.0
    }
}

/// Per-generation statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationSummary {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

/// Storage backend for cache generations.
///
/// Implementations must make `put` atomic per key (last write wins) and must
/// reject writes into a generation that does not exist.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the generation if missing.
    async fn open(&self, generation: &GenerationName) -> Result<(), Error>;

    /// Names of all existing generations, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all its entries. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    async fn get(&self, generation: &GenerationName, key: &RequestKey) -> Result<Option<StoredResponse>, Error>;

    async fn put(&self, generation: &GenerationName, key: &RequestKey, response: &StoredResponse)
    -> Result<(), Error>;

    /// URLs stored in a generation, sorted.
    async fn entries(&self, generation: &str) -> Result<Vec<String>, Error>;

    async fn summary(&self, generation: &str) -> Result<Option<GenerationSummary>, Error>;
}

/// Shared handle to a storage backend.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheStorage>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl CacheStore {
    pub fn new(backend: impl CacheStorage + 'static) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Open (creating if needed) a generation and return a handle bound to it.
    pub async fn open(&self, generation: &GenerationName) -> Result<CacheHandle, Error> {
        self.backend.open(generation).await?;
        Ok(CacheHandle { generation: generation.clone(), backend: self.backend.clone() })
    }

    /// Handle for a generation without creating it.
    ///
    /// Reads through the handle miss and writes fail if the generation does
    /// not exist.
    pub fn handle(&self, generation: &GenerationName) -> CacheHandle {
        CacheHandle { generation: generation.clone(), backend: self.backend.clone() }
    }

    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.backend.keys().await
    }

    pub async fn has(&self, generation: &str) -> Result<bool, Error> {
        Ok(self.backend.keys().await?.iter().any(|k| k == generation))
    }

    pub async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.backend.delete(generation).await
    }

    pub async fn entries(&self, generation: &str) -> Result<Vec<String>, Error> {
        self.backend.entries(generation).await
    }

    pub async fn summary(&self, generation: &str) -> Result<Option<GenerationSummary>, Error> {
        self.backend.summary(generation).await
    }
}

/// A store handle bound to one generation.
#[derive(Clone)]
pub struct CacheHandle {
    generation: GenerationName,
    backend: Arc<dyn CacheStorage>,
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle").field("generation", &self.generation).finish_non_exhaustive()
    }
}

impl CacheHandle {
    pub fn generation(&self) -> &GenerationName {
        &self.generation
    }

    pub async fn get(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.backend.get(&self.generation, key).await
    }

    /// Store a response. Failures are logged and swallowed.
    pub async fn put(&self, key: &RequestKey, response: &StoredResponse) -> bool {
        match self.backend.put(&self.generation, key, response).await {
            Ok(()) => {
                tracing::debug!(generation = %self.generation, url = key.url(), "stored response");
                true
            }
            Err(e) => {
                tracing::warn!(generation = %self.generation, url = key.url(), error = %e, "cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_name_validation() {
        assert!(GenerationName::new("app-v1").is_ok());
        assert!(matches!(GenerationName::new(""), Err(Error::InvalidGeneration(_))));
        assert!(matches!(GenerationName::new("app v1"), Err(Error::InvalidGeneration(_))));
        assert!(matches!(GenerationName::new("x".repeat(129)), Err(Error::InvalidGeneration(_))));
    }

    #[test]
    fn test_generation_name_serde() {
        let name: GenerationName = serde_json::from_str("\"app-v2\"").unwrap();
        assert_eq!(name.as_str(), "app-v2");
        assert!(serde_json::from_str::<GenerationName>("\"\"").is_err());
    }
}
