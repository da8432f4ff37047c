//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use swcache_client::{Network, ServiceWorker};
use swcache_core::{AppConfig, CacheDb, CacheStore, Error, Request, Response};

/// Serves fixed bodies by URL; everything else is unreachable.
#[derive(Default)]
pub struct FixedNetwork {
    routes: HashMap<String, (u16, &'static str)>,
}

impl FixedNetwork {
    pub fn with(mut self, url: &str, status: u16, body: &'static str) -> Self {
        self.routes.insert(url.to_string(), (status, body));
        self
    }
}

#[async_trait]
impl Network for FixedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let (status, body) = self
            .routes
            .get(request.url.as_str())
            .ok_or_else(|| Error::NetworkFailed(format!("{}: unreachable", request.url)))?;
        Ok(Response::new(
            request.url.clone(),
            StatusCode::from_u16(*status).unwrap(),
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        ))
    }
}

pub fn config(generation: &str) -> AppConfig {
    AppConfig {
        generation: generation.to_string(),
        origin: "https://app.example".to_string(),
        seed_list: vec!["/".into(), "/index.html".into(), "/manifest.json".into()],
        ..Default::default()
    }
}

pub fn site() -> FixedNetwork {
    FixedNetwork::default()
        .with("https://app.example/", 200, "<html>shell</html>")
        .with("https://app.example/index.html", 200, "<html>index</html>")
        .with("https://app.example/app.js", 200, "console.log(1)")
        .with("https://app.example/api/polls", 200, "[]")
}

pub async fn store() -> CacheStore {
    CacheStore::new(CacheDb::open_in_memory().await.unwrap())
}

pub fn worker(generation: &str, store: Option<CacheStore>) -> ServiceWorker {
    ServiceWorker::new(&config(generation), store, Arc::new(site())).unwrap()
}

/// Decode the JSON text content of a tool result.
pub fn output_of<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
