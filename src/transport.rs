// Async HTTP transport for authorder
// Uses reqwest to send signed query-protocol requests

use crate::auth::SignedRequest;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::{Duration, Instant};

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub duration_ms: u64,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &SignedRequest) -> Result<RawResponse>;
}

pub struct HttpTransport {
    pub client: Client,
}

impl HttpTransport {
    /// Build a transport whose client gives up after `timeout`.
    ///
    /// The prober enforces its own bound as well; this one only keeps
    /// sockets from lingering after the prober has moved on.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProbeError::Transport(format!("invalid header name `{}`: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProbeError::Transport(format!("invalid header value for `{}`: {}", name.as_str(), e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &SignedRequest) -> Result<RawResponse> {
        let started = Instant::now();
        let resp = self
            .client
            .post(&request.url)
            .headers(header_map(&request.headers)?)
            .body(request.body.clone())
            .send()
            .await?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        // A body cut short is a failed exchange, not an empty error envelope.
        let body = resp.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
