//! sw_fetch tool implementation.
//!
//! Routes a request through the worker's interceptor exactly as a page
//! request would be, and reports how it was served.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{FetchState, LifecycleHost, ResponseSource};
use swcache_core::{Request, RequestClass, Strategy};

use super::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Final URL of the served response.
    pub url: String,
    pub status: u16,
    pub class: RequestClass,
    pub strategy: Strategy,
    pub source: ResponseSource,
    /// Interceptor states in the order they were entered.
    pub states: Vec<FetchState>,
    pub headers: BTreeMap<String, String>,
    /// Body as UTF-8, or `None` for binary bodies.
    pub body: Option<String>,
    pub body_len: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(host: &dyn LifecycleHost, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let mut request = Request::parse(&params.method, &params.url)?;
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let outcome = host.fetch(request).await?;

    let response = outcome.response;
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();
    let bytes = response.into_body();

    let output = SwFetchOutput {
        url,
        status,
        class: outcome.class,
        strategy: outcome.strategy,
        source: outcome.source,
        states: outcome.states,
        headers,
        body: std::str::from_utf8(&bytes).ok().map(str::to_string),
        body_len: bytes.len(),
    };

    json_result(&output)
}
