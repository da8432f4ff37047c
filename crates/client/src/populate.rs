//! Install-time population of seed resources.
//!
//! Every seed is fetched and stored independently with bounded concurrency.
//! A failing seed is recorded in the [`InstallReport`] and logged; it never
//! aborts the others and never fails the install.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::{Origin, Url};

use crate::network::{Network, resolve};
use swcache_core::cache::CacheHandle;
use swcache_core::{Request, RequestKey};

/// A seed that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeedFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of populating a generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    /// Generation that was populated.
    pub generation: String,
    /// Seeds stored, in seed-list order.
    pub stored: Vec<String>,
    /// Seeds that failed, in seed-list order.
    pub failed: Vec<SeedFailure>,
    /// True when the store was unavailable and nothing could be persisted.
    #[serde(default)]
    pub degraded: bool,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.degraded
    }
}

/// Fetches seed resources into a generation.
#[derive(Clone)]
pub struct InstallPopulator {
    network: Arc<dyn Network>,
    origin: Url,
    concurrency: usize,
}

impl InstallPopulator {
    pub fn new(network: Arc<dyn Network>, origin: Url, concurrency: usize) -> Self {
        Self { network, origin, concurrency: concurrency.max(1) }
    }

    /// Populate `handle` with every seed.
    pub async fn populate(&self, handle: &CacheHandle, seeds: &[String]) -> InstallReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let origin = self.origin.origin();
        let mut join_set = JoinSet::new();

        for (index, seed) in seeds.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let network = self.network.clone();
            let handle = handle.clone();
            let base = self.origin.clone();
            let origin = origin.clone();

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = semaphore.acquire_owned().await;
                let result = store_seed(network.as_ref(), &handle, &base, &origin, &seed).await;
                (index, seed, result)
            });
        }

        let mut outcomes = Vec::with_capacity(seeds.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "seed task aborted"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = InstallReport { generation: handle.generation().to_string(), ..Default::default() };
        for (_, seed, result) in outcomes {
            match result {
                Ok(()) => report.stored.push(seed),
                Err(reason) => {
                    tracing::warn!(generation = %handle.generation(), seed = %seed, reason = %reason, "seed not cached");
                    report.failed.push(SeedFailure { url: seed, reason });
                }
            }
        }

        tracing::info!(
            generation = %handle.generation(),
            stored = report.stored.len(),
            failed = report.failed.len(),
            "install population finished"
        );

        report
    }
}

async fn store_seed(
    network: &dyn Network, handle: &CacheHandle, base: &Url, origin: &Origin, seed: &str,
) -> Result<(), String> {
    let url = resolve(base, seed).map_err(|e| e.to_string())?;
    let key = RequestKey::for_url(&url);
    let request = Request::new(http::Method::GET, url);

    let response = network.fetch(&request).await.map_err(|e| e.to_string())?;

    if !response.is_success() {
        return Err(format!("status {}", response.status().as_u16()));
    }
    if !response.is_same_origin(origin) {
        return Err(format!("cross-origin response from {}", response.url()));
    }

    let (_, stored) = response.tee();
    if handle.put(&key, &stored).await { Ok(()) } else { Err("store write failed".to_string()) }
}
