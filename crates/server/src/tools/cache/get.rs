//! cache_get tool implementation.
//!
//! Looks up the entry stored for a GET of a URL in the current generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;
use swcache_core::{Error, RequestKey};
use url::Url;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL of the stored resource.
    pub url: String,
}

/// A stored entry as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedEntry {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
    pub body_len: usize,
    /// Body as UTF-8, or `None` for binary bodies.
    pub body: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Generation searched.
    pub generation: String,
    /// The entry, if one is stored.
    pub entry: Option<CachedEntry>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ServiceWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = Url::parse(params.url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = RequestKey::for_url(&url);

    let entry = worker.lookup(&key).await?.map(|stored| CachedEntry {
        url: stored.url,
        status: stored.status,
        headers: stored.headers,
        stored_at: stored.stored_at,
        body_len: stored.body.len(),
        body: std::str::from_utf8(&stored.body).ok().map(str::to_string),
    });

    json_result(&CacheGetOutput { generation: worker.generation().to_string(), entry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output_of, store, worker};
    use swcache_client::LifecycleHost;

    #[tokio::test]
    async fn test_get_before_activation_misses() {
        let worker = worker("app-v1", Some(store().await));
        worker.install_configured().await.unwrap();

        let params = CacheGetParams { url: "https://app.example/index.html".to_string() };
        let output: CacheGetOutput = output_of(&get_impl(&worker, params).await.unwrap());

        assert!(output.entry.is_none());
    }

    #[tokio::test]
    async fn test_get_found() {
        let worker = worker("app-v1", Some(store().await));
        worker.install_configured().await.unwrap();
        worker.activate().await.unwrap();

        let params = CacheGetParams { url: "https://app.example/index.html#top".to_string() };
        let output: CacheGetOutput = output_of(&get_impl(&worker, params).await.unwrap());

        let entry = output.entry.unwrap();
        assert_eq!(output.generation, "app-v1");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body.as_deref(), Some("<html>index</html>"));
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let worker = worker("app-v1", None);
        let params = CacheGetParams { url: "/relative".to_string() };
        let err = get_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
