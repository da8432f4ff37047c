//! Per-request interception.
//!
//! A request moves through
//! `Received -> Classified -> StrategySelected -> Serving* -> Completed | Failed`.
//! Store writes happen on detached tasks so the caller never waits for them;
//! [`Interceptor::settle`] awaits whatever is still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Origin;

use crate::generation::GenerationManager;
use crate::network::Network;
use swcache_core::cache::CacheHandle;
use swcache_core::{Classifier, Error, Request, RequestClass, RequestKey, Response, Strategy, StrategySelector};

/// Interceptor state transitions, recorded on every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Received,
    Classified,
    StrategySelected,
    ServingFromCache,
    ServingFromNetwork,
    ServingFromNetworkWithPopulate,
    ServingFromNetworkWithFallback,
    Completed,
    Failed,
}

/// Where the served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// A served response plus how it was produced.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub class: RequestClass,
    pub strategy: Strategy,
    pub source: ResponseSource,
    pub states: Vec<FetchState>,
}

struct Trace {
    states: Vec<FetchState>,
}

impl Trace {
    fn new() -> Self {
        Self { states: vec![FetchState::Received] }
    }

    fn push(&mut self, state: FetchState) {
        tracing::trace!(?state, "fetch transition");
        self.states.push(state);
    }
}

/// Composes classifier, strategy selector, store, and network.
pub struct Interceptor {
    classifier: Classifier,
    selector: StrategySelector,
    generations: Option<Arc<GenerationManager>>,
    network: Arc<dyn Network>,
    origin: Origin,
    pending: Mutex<JoinSet<()>>,
    store_degraded: AtomicBool,
}

impl Interceptor {
    /// `generations` is `None` when no store backend is available; every
    /// strategy then behaves as network-only.
    pub fn new(
        classifier: Classifier, selector: StrategySelector, generations: Option<Arc<GenerationManager>>,
        network: Arc<dyn Network>, origin: Origin,
    ) -> Self {
        Self {
            classifier,
            selector,
            generations,
            network,
            origin,
            pending: Mutex::new(JoinSet::new()),
            store_degraded: AtomicBool::new(false),
        }
    }

    /// Serve a request according to its class.
    pub async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let mut trace = Trace::new();

        let class = self.classifier.classify(&request);
        trace.push(FetchState::Classified);

        let strategy = self.selector.select(class);
        trace.push(FetchState::StrategySelected);

        tracing::debug!(method = %request.method, url = %request.url, ?class, ?strategy, "intercepted");

        let result = match strategy {
            Strategy::NetworkOnly => self.network_only(&request, &mut trace).await,
            Strategy::NetworkFirst => self.network_first(&request, &mut trace).await,
            Strategy::CacheFirst => self.cache_first(&request, &mut trace).await,
        };

        match result {
            Ok((response, source)) => {
                trace.push(FetchState::Completed);
                Ok(FetchOutcome { response, class, strategy, source, states: trace.states })
            }
            Err(e) => {
                trace.push(FetchState::Failed);
                tracing::debug!(url = %request.url, error = %e, states = ?trace.states, "fetch failed");
                Err(e)
            }
        }
    }

    /// Wait for every store write spawned so far.
    pub async fn settle(&self) {
        let mut in_flight = std::mem::take(&mut *self.pending.lock().await);
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::debug!(error = %e, "store write task did not finish");
            }
        }
    }

    async fn network_only(&self, request: &Request, trace: &mut Trace) -> Result<(Response, ResponseSource), Error> {
        trace.push(FetchState::ServingFromNetwork);
        let response = self.network.fetch(request).await?;
        Ok((response, ResponseSource::Network))
    }

    async fn cache_first(&self, request: &Request, trace: &mut Trace) -> Result<(Response, ResponseSource), Error> {
        let Some((handle, key)) = self.cache_target(request).await else {
            return self.network_only(request, trace).await;
        };

        if let Some(response) = self.lookup(&handle, &key).await {
            trace.push(FetchState::ServingFromCache);
            return Ok((response, ResponseSource::Cache));
        }

        trace.push(FetchState::ServingFromNetworkWithPopulate);
        let response = self.network.fetch(request).await?;
        Ok((self.populate(handle, key, response).await, ResponseSource::Network))
    }

    async fn network_first(&self, request: &Request, trace: &mut Trace) -> Result<(Response, ResponseSource), Error> {
        let Some((handle, key)) = self.cache_target(request).await else {
            return self.network_only(request, trace).await;
        };

        trace.push(FetchState::ServingFromNetworkWithFallback);
        match self.network.fetch(request).await {
            Ok(response) => Ok((self.populate(handle, key, response).await, ResponseSource::Network)),
            // Only an unreachable origin falls back; any other error means the
            // origin answered.
            Err(network_err @ Error::NetworkFailed(_)) => match self.lookup(&handle, &key).await {
                Some(response) => {
                    tracing::debug!(url = %request.url, error = %network_err, "network failed, serving stored entry");
                    trace.push(FetchState::ServingFromCache);
                    Ok((response, ResponseSource::Cache))
                }
                None => Err(network_err),
            },
            Err(e) => Err(e),
        }
    }

    /// Handle for the current generation and the request key, if this request
    /// may touch the store at all.
    async fn cache_target(&self, request: &Request) -> Option<(CacheHandle, RequestKey)> {
        let key = RequestKey::for_request(request)?;
        let handle = self.generations.as_ref()?.current_handle().await?;
        Some((handle, key))
    }

    async fn lookup(&self, handle: &CacheHandle, key: &RequestKey) -> Option<Response> {
        match handle.get(key).await {
            Ok(Some(stored)) => match stored.to_response() {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(url = key.url(), error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.note_store_failure(&e);
                None
            }
        }
    }

    /// Store a copy of `response` in the background when it is cacheable and
    /// return the response to serve.
    async fn populate(&self, handle: CacheHandle, key: RequestKey, response: Response) -> Response {
        if !self.is_cacheable(&response) {
            tracing::debug!(
                url = key.url(),
                status = response.status().as_u16(),
                final_url = %response.url(),
                "response not cacheable"
            );
            return response;
        }

        let (served, stored) = response.tee();
        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            handle.put(&key, &stored).await;
        });

        served
    }

    fn is_cacheable(&self, response: &Response) -> bool {
        response.is_success()
            && response.status() != http::StatusCode::PARTIAL_CONTENT
            && response.is_same_origin(&self.origin)
    }

    fn note_store_failure(&self, error: &Error) {
        if !self.store_degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(error = %error, "cache store unavailable, serving from network");
        } else {
            tracing::debug!(error = %error, "cache store still unavailable");
        }
    }
}
