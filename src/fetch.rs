//! JSON-over-HTTP fetching for the dashboard data sources.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("request to {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("response from {url} is not valid JSON: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Parse { .. } => "parse",
        }
    }
}

/// Issues one GET per call and parses the body as JSON.
pub trait JsonFetcher: Send + Sync {
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// No retries, no timeout, no caching: every call is a fresh round trip.
pub struct ReqwestJsonFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestJsonFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestJsonFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFetcher for ReqwestJsonFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!(component = "fetch", event = "fetch.request", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|err| FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let value = parse_json_body(url, &body)?;
        debug!(
            component = "fetch",
            event = "fetch.response",
            url,
            status = status.as_u16(),
            body_len = body.len()
        );
        Ok(value)
    }
}

pub fn parse_json_body(url: &str, body: &[u8]) -> Result<Value, FetchError> {
    serde_json::from_slice(body).map_err(|err| FetchError::Parse {
        url: url.to_string(),
        message: err.to_string(),
    })
}
