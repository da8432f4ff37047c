//! cache_purge tool implementation.
//!
//! Deletes every generation other than the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;

use crate::tools::json_result;

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Generations deleted.
    pub purged: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let purged = worker.purge_superseded().await?;
    json_result(&CachePurgeOutput { purged })
}
