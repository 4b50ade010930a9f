//! Transport - "GET url, get JSON back"
//!
//! TigerStyle: One seam between the composer and the network.
//!
//! `HttpTransport` performs real blocking requests; `FixtureTransport`
//! answers from canned documents so the composer can be tested offline.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::FetchError;
use crate::constants::{APP_NAME, APP_VERSION};

/// Something that can resolve a URL to a JSON document.
pub trait Transport {
    /// Fetch `url` and parse the body as JSON.
    ///
    /// # Errors
    /// Any failure to reach the URL, a non-success status, or a body that is
    /// not JSON.
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

// =============================================================================
// HttpTransport
// =============================================================================

/// Blocking HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client identifying itself as this application.
    ///
    /// Requests never time out; a slow upstream is waited for.
    ///
    /// # Errors
    /// Returns `FetchError::Request` if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                message: format!("failed to build client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "GET");

        let response = self.client.get(url).send().map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

// =============================================================================
// FixtureTransport
// =============================================================================

/// In-memory transport serving canned documents.
///
/// Unknown URLs answer like a server would: HTTP 404.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    documents: HashMap<String, Value>,
    requested: RefCell<Vec<String>>,
}

impl FixtureTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` at `url`.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, document: Value) -> Self {
        self.insert(url, document);
        self
    }

    /// Serve `document` at `url`, replacing any previous one.
    pub fn insert(&mut self, url: impl Into<String>, document: Value) {
        self.documents.insert(url.into(), document);
    }

    /// Every URL requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Transport for FixtureTransport {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requested.borrow_mut().push(url.to_string());
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
