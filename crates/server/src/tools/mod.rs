//! MCP tool implementations.
//!
//! Each tool takes the shared [`ServiceWorker`](swcache_client::ServiceWorker)
//! and returns its output as pretty-printed JSON text content.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheGetParams, CacheListParams};
pub use fetch::SwFetchParams;
pub use lifecycle::{SwInstallParams, SwMessageParams};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

/// Serialize a tool output as a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
