//! Network access for intercepted requests.
//!
//! The [`Network`] trait is what the interceptor delegates to when a strategy
//! needs the origin. [`HttpNetwork`] implements it with reqwest:
//!
//! - Redirects followed up to a limit; the final URL is kept on the response
//!   so same-origin checks see where the bytes actually came from.
//! - Body size capped by `max_bytes` (declared length and actual length).
//! - Non-success statuses are returned as responses, not errors. Only a
//!   transport failure (DNS, refused, timeout, reset) is `NetworkFailed`.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

pub use url::{UrlError, resolve};

use swcache_core::{AppConfig, Error, Request, Response};

/// Something that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl NetworkConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    http: Client,
    config: NetworkConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: NetworkConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::NetworkFailed(format!("{} {}: {}", request.method, request.url, e)))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::ResponseTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkFailed(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::ResponseTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response::new(final_url, status, headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_network_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), max_bytes: 42, timeout_ms: 500, ..Default::default() };
        let config = NetworkConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_bytes, 42);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/styles/site.css"))
            .and(header("accept", "text/css"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("body{}", "text/css"))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let request = Request::get(&format!("{}/styles/site.css", server.uri()))
            .unwrap()
            .with_header("accept", "text/css");

        let response = network.fetch(&request).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.headers().get("content-type").unwrap(), "text/css");
        assert_eq!(response.into_body(), bytes::Bytes::from_static(b"body{}"));
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/polls"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let request = Request::get(&format!("{}/api/polls", server.uri())).unwrap();

        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status().as_u16(), 503);
    }

    #[tokio::test]
    async fn test_fetch_forwards_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/votes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let request = Request::parse("POST", &format!("{}/api/votes", server.uri())).unwrap();

        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig { max_bytes: 16, ..Default::default() }).unwrap();
        let request = Request::get(&format!("{}/big.png", server.uri())).unwrap();

        let result = network.fetch(&request).await;
        assert!(matches!(result, Err(Error::ResponseTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let network =
            HttpNetwork::new(NetworkConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        let request = Request::get("http://127.0.0.1:9/unreachable.js").unwrap();

        let result = network.fetch(&request).await;
        assert!(matches!(result, Err(Error::NetworkFailed(_))));
    }
}
