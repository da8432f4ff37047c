//! In-process network double for strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use url::Url;

use crate::network::Network;
use swcache_core::{Error, Request, Response};

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: Bytes,
    final_url: Option<Url>,
    delay: Option<Duration>,
    oversized: bool,
}

/// Serves scripted responses by URL and records every call.
///
/// Unknown URLs and every URL while offline fail with `NetworkFailed`.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: &'static str) -> &Self {
        self.insert(url, Route {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from_static(body.as_bytes()),
            final_url: None,
            delay: None,
            oversized: false,
        })
    }

    /// Route whose response reports a different final URL (a redirect).
    pub fn redirect(&self, url: &str, final_url: &str, body: &'static str) -> &Self {
        self.insert(url, Route {
            status: StatusCode::OK,
            body: Bytes::from_static(body.as_bytes()),
            final_url: Some(Url::parse(final_url).unwrap()),
            delay: None,
            oversized: false,
        })
    }

    pub fn slow(&self, url: &str, delay: Duration, body: &'static str) -> &Self {
        self.insert(url, Route {
            status: StatusCode::OK,
            body: Bytes::from_static(body.as_bytes()),
            final_url: None,
            delay: Some(delay),
            oversized: false,
        })
    }

    /// Route whose body exceeds the size limit: the origin answers, but the
    /// fetch fails with `ResponseTooLarge`.
    pub fn oversized(&self, url: &str) -> &Self {
        self.insert(url, Route {
            status: StatusCode::OK,
            body: Bytes::new(),
            final_url: None,
            delay: None,
            oversized: true,
        })
    }

    fn insert(&self, url: &str, route: Route) -> &Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls made for a URL.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailed(format!("{url}: offline")));
        }

        let route = self.routes.lock().unwrap().get(&url).cloned();
        let route = route.ok_or_else(|| Error::NetworkFailed(format!("{url}: unreachable")))?;

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        if route.oversized {
            return Err(Error::ResponseTooLarge(format!("{url}: body exceeds limit")));
        }

        let mut headers = HeaderMap::new();
        headers.insert("x-served-by", HeaderValue::from_static("network"));
        let final_url = route.final_url.unwrap_or_else(|| request.url.clone());
        Ok(Response::new(final_url, route.status, headers, route.body))
    }
}
