//! HTTP layer — the single point of entry for every backend call.
//!
//! `ApiClient` wraps a `Transport` with bearer-token attachment, session
//! invalidation on 401 and collapsing of identical in-flight GETs.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;

pub mod client;
pub mod registry;
pub mod transport;

pub use client::{ApiClient, UnauthorizedHandler};
pub use registry::PendingRegistry;
pub use transport::{ReqwestTransport, Transport};

/// Query parameters, kept sorted by key. Array values are sent as repeated keys.
pub type Params = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL (absolute URLs pass through).
    pub url: String,
    pub params: Params,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Params::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Identity of a GET for deduplication: `get:<url>:<sorted params as JSON>`.
    /// Other methods have no fingerprint and are never collapsed.
    pub fn fingerprint(&self) -> Option<String> {
        if self.method != Method::GET {
            return None;
        }
        let params = serde_json::to_string(&self.params).unwrap_or_else(|_| "{}".to_string());
        Some(format!(
            "{}:{}:{}",
            self.method.as_str().to_lowercase(),
            self.url,
            params
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Set when this caller joined another caller's in-flight request.
    pub deduplicated: bool,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            deduplicated: false,
        }
    }

    /// Deserializes the body. An empty body reads as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
