//! MCP server handler implementation.
//!
//! The server plays the host runtime: it owns one [`ServiceWorker`] and
//! routes tool calls to its lifecycle callbacks and cache inspection.

use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheListParams, get_impl, list_impl, purge_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{SwInstallParams, SwMessageParams, activate_impl, install_impl, message_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::ServiceWorker;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<ServiceWorker>,
}

#[tool_router]
impl SwCacheServer {
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { tool_router: Self::tool_router(), worker }
    }

    #[tool(
        description = "Install the worker: fetch and store seed resources into its generation. Uses the configured seed list unless seeds are given. Failed seeds are reported, never fatal."
    )]
    async fn sw_install(&self, params: Parameters<SwInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker, params.0).await
    }

    #[tool(description = "Activate the installed generation and delete every other generation.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route a request through the interceptor.
    #[tool(
        description = "Fetch a URL through the worker. Reports the request class, strategy, whether the response came from cache or network, and the response itself."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.worker.as_ref(), params.0).await
    }

    #[tool(description = "Send a message to the worker. Supported command: skip-waiting.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(self.worker.as_ref(), params.0).await
    }

    #[tool(description = "Look up the stored response for a URL in the current generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache generations with entry counts and sizes.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete every generation other than the current one.")]
    async fn cache_purge(&self) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
