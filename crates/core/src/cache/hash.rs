//! Request key derivation.

use http::Method;
use sha2::{Digest, Sha256};
use url::Url;

use crate::request::Request;

/// Compute the storage hash for a method + URL pair.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key under which a response is stored inside a generation.
///
/// Only GET requests produce a key; the URL fragment never participates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    hash: String,
    method: String,
    url: String,
}

impl RequestKey {
    /// Derive the key for a request, or `None` if the request is not cacheable.
    pub fn for_request(request: &Request) -> Option<Self> {
        if request.method != Method::GET {
            return None;
        }
        Some(Self::for_url(&request.url))
    }

    /// Key for a GET of the given URL.
    pub fn for_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let url = url.to_string();
        let method = Method::GET.as_str().to_string();
        Self { hash: compute_request_key(&method, &url), method, url }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
