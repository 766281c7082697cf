//! HTTP submission and commit to the remote search index.

use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::error::TransportError;
use crate::payload::COMMIT_PAYLOAD;

/// Content type of every request body.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// Longest slice of an error response body copied into the log.
const LOGGED_BODY_CHARS: usize = 300;

/// Destination for rendered payloads.
pub trait IndexClient: Send + Sync {
    /// Post one payload. Non-2xx responses are logged; only transport failures are errors.
    fn submit(&self, payload: &str) -> Result<(), TransportError>;

    /// Ask the index to make submitted documents visible.
    fn commit(&self) -> Result<(), TransportError> {
        self.submit(COMMIT_PAYLOAD)
    }
}

/// Blocking HTTP client. No idle connections are kept, so each request's connection is
/// released when its response is dropped, on success and on error alike.
pub struct HttpIndexClient {
    url: String,
    client: Client,
}

impl HttpIndexClient {
    /// `timeout: None` lets requests wait indefinitely.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(HttpIndexClient {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, body: &str) -> Result<StatusCode, TransportError> {
        let http_err = |source| TransportError::Http {
            url: self.url.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body.to_owned())
            .send()
            .map_err(http_err)?;
        let status = response.status();
        // Reading the body to the end hands the connection back before it is dropped.
        let text = response.text().map_err(http_err)?;
        if status.is_success() {
            debug!("POST {} -> {}", self.url, status);
        } else {
            let snippet: String = text.chars().take(LOGGED_BODY_CHARS).collect();
            warn!("POST {} returned {}: {}", self.url, status, snippet.trim());
        }
        Ok(status)
    }
}

impl IndexClient for HttpIndexClient {
    fn submit(&self, payload: &str) -> Result<(), TransportError> {
        self.post(payload).map(|_| ())
    }
}
