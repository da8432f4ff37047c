//! sw_install, sw_activate, and sw_message tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{LifecycleHost, ServiceWorker};

use super::json_result;

/// Parameters for the sw_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallParams {
    /// Seed URLs to populate, relative to the origin or absolute.
    /// Defaults to the configured seed list.
    #[serde(default)]
    pub seeds: Option<Vec<String>>,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Command to deliver, e.g. "skip-waiting".
    pub command: String,
}

pub async fn install_impl(worker: &ServiceWorker, params: SwInstallParams) -> Result<CallToolResult, McpError> {
    let report = match params.seeds {
        Some(seeds) => worker.install(&seeds).await?,
        None => worker.install_configured().await?,
    };
    json_result(&report)
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}

pub async fn message_impl(host: &dyn LifecycleHost, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = host.message(&params.command).await?;
    json_result(&reply)
}
