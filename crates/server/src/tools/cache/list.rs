//! cache_list tool implementation.
//!
//! Enumerates generations with entry counts, optionally listing stored URLs.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;
use swcache_core::Error;
use swcache_core::cache::GenerationSummary;

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Include the stored URLs of each generation.
    #[serde(default)]
    pub include_entries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationListing {
    #[serde(flatten)]
    pub summary: GenerationSummary,
    /// True for the generation this worker installs and activates.
    pub target: bool,
    /// Stored URLs, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub generations: Vec<GenerationListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &ServiceWorker, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let store = worker
        .store()
        .ok_or_else(|| Error::StoreUnavailable("no cache store attached".into()))?;

    let mut generations = Vec::new();
    for name in store.keys().await? {
        let Some(summary) = store.summary(&name).await? else {
            continue;
        };
        let urls = if params.include_entries { Some(store.entries(&name).await?) } else { None };
        generations.push(GenerationListing { target: name == worker.generation().as_str(), summary, urls });
    }

    json_result(&CacheListOutput { generations })
}
