//! Request and response descriptors exchanged between the host and the cache.
//!
//! A [`Response`] owns its body and hands it out exactly once through
//! [`Response::into_body`]. Any path that needs to both serve and persist a
//! response must call [`Response::tee`] first, which yields an independent
//! [`StoredResponse`] copy.

use bytes::Bytes;
use chrono::Utc;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use url::{Origin, Url};

use crate::Error;

/// An outgoing request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new() }
    }

    /// Parse a method name and absolute URL into a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unknown method and
    /// `Error::InvalidUrl` if the URL does not parse.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {method:?}: {e}")))?;
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Shorthand for a GET request.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::parse("GET", url)
    }

    /// Attach a header, ignoring names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A response whose body can be consumed at most once.
///
/// Not `Clone`. Use [`Response::tee`] to obtain a copy for storage before
/// the body is handed to the caller.
#[derive(Debug)]
pub struct Response {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { url, status, headers, body }
    }

    /// Final URL of the response (after redirects).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the response was served from the given origin.
    pub fn is_same_origin(&self, origin: &Origin) -> bool {
        self.url.origin() == *origin
    }

    /// Consume the response, yielding its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Split into the response to serve and an independent stored copy.
    ///
    /// The two halves share no consumption state: either can be dropped or
    /// consumed without affecting the other.
    pub fn tee(self) -> (Response, StoredResponse) {
        let stored = StoredResponse {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            headers: header_pairs(&self.headers),
            body: self.body.clone(),
            stored_at: Utc::now().to_rfc3339(),
        };
        (self, stored)
    }
}

/// An immutable response snapshot held by the cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: String,
}

impl StoredResponse {
    /// Rebuild a servable response from the snapshot.
    ///
    /// Header pairs that are no longer valid HTTP are dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the stored URL does not parse, or
    /// `Error::InvalidInput` if the stored status is out of range.
    pub fn to_response(&self) -> Result<Response, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| Error::InvalidInput(format!("stored status {}: {e}", self.status)))?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Ok(Response::new(url, status, headers, self.body.clone()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}
