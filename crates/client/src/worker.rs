//! The worker instance and the interface its host drives.
//!
//! A [`ServiceWorker`] moves through `Parsed -> Installed -> Activated`.
//! Installing populates the target generation; activating promotes it and
//! purges every other generation. Fetches are intercepted in every state, but
//! nothing is served from the store until a generation is current.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::generation::GenerationManager;
use crate::intercept::{FetchOutcome, Interceptor};
use crate::network::Network;
use crate::populate::{InstallPopulator, InstallReport};
use swcache_core::cache::{CacheStore, GenerationName};
use swcache_core::{AppConfig, Classifier, Error, Request, RequestKey, StoredResponse, StrategySelector};

/// Callbacks a host runtime invokes on a worker.
#[async_trait]
pub trait LifecycleHost: Send + Sync {
    async fn install(&self, seeds: &[String]) -> Result<InstallReport, Error>;

    async fn activate(&self) -> Result<ActivationReport, Error>;

    async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error>;

    async fn message(&self, command: &str) -> Result<MessageReply, Error>;
}

/// Commands accepted by [`LifecycleHost::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SkipWaiting,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "skip-waiting" | "SKIP_WAITING" => Ok(Command::SkipWaiting),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installed,
    Activated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    pub generation: String,
    pub purged: Vec<String>,
    /// True when the store could not be updated; the generation is current
    /// but serving degrades to network.
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MessageReply {
    pub command: String,
    pub state: LifecycleState,
    /// Present when the command promoted the generation.
    pub activation: Option<ActivationReport>,
}

/// A worker bound to one generation.
pub struct ServiceWorker {
    target: GenerationName,
    seeds: Vec<String>,
    generations: Option<Arc<GenerationManager>>,
    populator: InstallPopulator,
    interceptor: Interceptor,
    state: Mutex<LifecycleState>,
    skip_waiting: AtomicBool,
}

impl ServiceWorker {
    /// Build a worker from configuration.
    ///
    /// `store` is `None` when no backend could be opened; the worker then
    /// serves everything from the network.
    pub fn new(config: &AppConfig, store: Option<CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let target = config.generation_name()?;
        let origin = config.origin_url()?;

        let generations = store.map(|s| Arc::new(GenerationManager::new(s, target.clone())));
        let populator = InstallPopulator::new(network.clone(), origin.clone(), config.install_concurrency);
        let interceptor = Interceptor::new(
            Classifier::from_config(config),
            StrategySelector::from_config(config),
            generations.clone(),
            network,
            origin.origin(),
        );

        Ok(Self {
            target,
            seeds: config.seed_list.clone(),
            generations,
            populator,
            interceptor,
            state: Mutex::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
        })
    }

    pub fn generation(&self) -> &GenerationName {
        &self.target
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// The shared store, if one is attached.
    pub fn store(&self) -> Option<&CacheStore> {
        self.generations.as_ref().map(|g| g.store())
    }

    /// Install with the configured seed list.
    pub async fn install_configured(&self) -> Result<InstallReport, Error> {
        self.install(&self.seeds).await
    }

    /// Look up a stored response in the current generation.
    pub async fn lookup(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        match &self.generations {
            Some(generations) => generations.match_any(key).await,
            None => Ok(None),
        }
    }

    /// Delete every generation except the current one.
    pub async fn purge_superseded(&self) -> Result<Vec<String>, Error> {
        let _lifecycle = self.state.lock().await;
        match &self.generations {
            Some(generations) => generations.purge_superseded().await,
            None => Err(Error::StoreUnavailable("no cache store attached".into())),
        }
    }

    /// Wait for pending store writes.
    pub async fn settle(&self) {
        self.interceptor.settle().await;
    }

    async fn promote(&self, state: &mut LifecycleState) -> ActivationReport {
        let mut report = ActivationReport { generation: self.target.to_string(), purged: Vec::new(), degraded: false };

        match &self.generations {
            Some(generations) => match generations.activate().await {
                Ok(purged) => report.purged = purged,
                Err(e) => {
                    tracing::warn!(generation = %self.target, error = %e, "activation could not update the store");
                    generations.claim().await;
                    report.degraded = true;
                }
            },
            None => {
                tracing::warn!(generation = %self.target, "activated without a cache store");
                report.degraded = true;
            }
        }

        *state = LifecycleState::Activated;
        report
    }
}

#[async_trait]
impl LifecycleHost for ServiceWorker {
    async fn install(&self, seeds: &[String]) -> Result<InstallReport, Error> {
        let mut state = self.state.lock().await;
        if *state == LifecycleState::Activated {
            return Err(Error::InvalidInput(format!("generation {} is already active", self.target)));
        }

        tracing::info!(generation = %self.target, seeds = seeds.len(), "installing");

        let prepared = match &self.generations {
            Some(generations) => match generations.prepare().await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(generation = %self.target, error = %e, "cache store unavailable during install");
                    None
                }
            },
            None => None,
        };

        let report = match prepared {
            Some(handle) => self.populator.populate(&handle, seeds).await,
            None => InstallReport { generation: self.target.to_string(), degraded: true, ..Default::default() },
        };

        *state = LifecycleState::Installed;
        tracing::info!(generation = %self.target, complete = report.is_complete(), "installed");

        if self.skip_waiting.load(Ordering::SeqCst) {
            tracing::info!(generation = %self.target, "skip-waiting pending, activating");
            self.promote(&mut state).await;
        }

        Ok(report)
    }

    async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut state = self.state.lock().await;
        if *state == LifecycleState::Parsed {
            return Err(Error::NotInstalled(format!("generation {} has not been installed", self.target)));
        }
        Ok(self.promote(&mut state).await)
    }

    async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        self.interceptor.fetch(request).await
    }

    /// A skip-waiting received before install completes is honored when the
    /// install finishes.
    async fn message(&self, command: &str) -> Result<MessageReply, Error> {
        let parsed: Command = command.parse()?;
        tracing::debug!(?parsed, "message received");

        match parsed {
            Command::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                let mut state = self.state.lock().await;
                let activation = match *state {
                    LifecycleState::Installed => Some(self.promote(&mut state).await),
                    LifecycleState::Parsed | LifecycleState::Activated => None,
                };
                Ok(MessageReply { command: command.trim().to_string(), state: *state, activation })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::ResponseSource;
    use crate::testing::ScriptedNetwork;
    use swcache_core::{CacheDb, MemoryStore, RequestClass};
    use url::Url;

    fn config(generation: &str) -> AppConfig {
        AppConfig {
            generation: generation.to_string(),
            origin: "https://app.example".to_string(),
            seed_list: vec!["/".into(), "/index.html".into(), "/manifest.json".into()],
            ..Default::default()
        }
    }

    fn shell_network() -> Arc<ScriptedNetwork> {
        let network = Arc::new(ScriptedNetwork::new());
        network
            .route("https://app.example/", 200, "<html>shell</html>")
            .route("https://app.example/index.html", 200, "<html>index</html>");
        network
    }

    fn key(url: &str) -> RequestKey {
        RequestKey::for_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_command_parse() {
        assert_eq!("skip-waiting".parse::<Command>().unwrap(), Command::SkipWaiting);
        assert_eq!("SKIP_WAITING".parse::<Command>().unwrap(), Command::SkipWaiting);
        assert!(matches!("reload".parse::<Command>(), Err(Error::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn test_seed_install_with_unreachable_manifest() {
        let network = shell_network();
        let store = CacheStore::new(CacheDb::open_in_memory().await.unwrap());
        let worker = ServiceWorker::new(&config("app-v1"), Some(store.clone()), network).unwrap();

        let report = worker.install_configured().await.unwrap();

        assert_eq!(report.stored, vec!["/", "/index.html"]);
        assert_eq!(report.failed[0].url, "/manifest.json");
        assert_eq!(worker.state().await, LifecycleState::Installed);
        assert_eq!(
            store.entries("app-v1").await.unwrap(),
            vec!["https://app.example/".to_string(), "https://app.example/index.html".to_string()]
        );
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), shell_network())
            .unwrap();

        assert!(matches!(worker.activate().await, Err(Error::NotInstalled(_))));
        assert_eq!(worker.state().await, LifecycleState::Parsed);
    }

    #[tokio::test]
    async fn test_install_after_activation_rejected() {
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), shell_network())
            .unwrap();
        worker.install_configured().await.unwrap();
        worker.activate().await.unwrap();

        assert!(matches!(worker.install_configured().await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_nothing_served_from_store_before_activation() {
        let network = shell_network();
        network.route("https://app.example/app.css", 200, "css");
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), network.clone())
            .unwrap();
        worker.install(&["/app.css".to_string()]).await.unwrap();

        let outcome = worker.fetch(Request::get("https://app.example/app.css").unwrap()).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(network.calls_to("https://app.example/app.css"), 2);
    }

    #[tokio::test]
    async fn test_seeded_asset_served_offline_after_activation() {
        let network = shell_network();
        network.route("https://app.example/app.js", 200, "js");
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), network.clone())
            .unwrap();
        worker.install(&["/app.js".to_string()]).await.unwrap();
        worker.activate().await.unwrap();

        network.set_offline(true);
        let outcome = worker.fetch(Request::get("https://app.example/app.js").unwrap()).await.unwrap();

        assert_eq!(outcome.class, RequestClass::StaticAsset);
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.into_body(), bytes::Bytes::from_static(b"js"));
    }

    #[tokio::test]
    async fn test_new_generation_replaces_old() {
        let network = shell_network();
        network.route("https://app.example/app.js", 200, "v1");
        let store = CacheStore::new(CacheDb::open_in_memory().await.unwrap());

        let v1 = ServiceWorker::new(&config("app-v1"), Some(store.clone()), network.clone()).unwrap();
        v1.install(&["/app.js".to_string()]).await.unwrap();
        v1.activate().await.unwrap();

        network.route("https://app.example/app.js", 200, "v2");
        let v2 = ServiceWorker::new(&config("app-v2"), Some(store.clone()), network.clone()).unwrap();
        v2.install(&["/app.js".to_string()]).await.unwrap();
        let report = v2.activate().await.unwrap();

        assert_eq!(report.purged, vec!["app-v1".to_string()]);
        assert_eq!(store.keys().await.unwrap(), vec!["app-v2".to_string()]);

        network.set_offline(true);
        let outcome = v2.fetch(Request::get("https://app.example/app.js").unwrap()).await.unwrap();
        assert_eq!(outcome.response.into_body(), bytes::Bytes::from_static(b"v2"));

        // The old instance's current generation is gone, so it can only miss.
        let stale = v1.fetch(Request::get("https://app.example/app.js").unwrap()).await;
        assert!(stale.is_err());
        assert!(v1.lookup(&key("https://app.example/app.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skip_waiting_after_install_activates() {
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), shell_network())
            .unwrap();
        worker.install_configured().await.unwrap();

        let reply = worker.message("skip-waiting").await.unwrap();

        assert_eq!(reply.state, LifecycleState::Activated);
        assert_eq!(reply.activation.unwrap().generation, "app-v1");
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_deferred() {
        let worker = ServiceWorker::new(&config("app-v1"), Some(CacheStore::new(MemoryStore::new())), shell_network())
            .unwrap();

        let reply = worker.message("skip-waiting").await.unwrap();
        assert_eq!(reply.state, LifecycleState::Parsed);
        assert!(reply.activation.is_none());

        worker.install_configured().await.unwrap();
        assert_eq!(worker.state().await, LifecycleState::Activated);
        assert!(worker.lookup(&key("https://app.example/index.html")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_message_rejected() {
        let worker = ServiceWorker::new(&config("app-v1"), None, shell_network()).unwrap();
        assert!(matches!(worker.message("claim-all").await, Err(Error::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn test_without_store_degrades_to_network() {
        let network = shell_network();
        let worker = ServiceWorker::new(&config("app-v1"), None, network.clone()).unwrap();

        let report = worker.install_configured().await.unwrap();
        assert!(report.degraded);
        assert_eq!(network.total_calls(), 0);

        let activation = worker.activate().await.unwrap();
        assert!(activation.degraded);

        let outcome = worker.fetch(Request::get("https://app.example/").unwrap()).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert!(matches!(worker.purge_superseded().await, Err(Error::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_invalid_generation_rejected() {
        let result = ServiceWorker::new(&config("has space"), None, shell_network());
        assert!(matches!(result, Err(Error::InvalidGeneration(_))));
    }
}
