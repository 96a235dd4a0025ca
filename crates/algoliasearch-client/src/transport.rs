//! HTTP transport used by the request executor
//!
//! The executor only needs "send these bytes to this URL and give me the
//! status and body back". Keeping that behind a trait lets the failover logic
//! run against scripted hosts in tests.

use std::{fmt, time::Duration};

use algoliasearch_types::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use thiserror::Error;
use tracing::debug;

/// One request to one host
#[derive(Debug, Clone)]
pub struct HostRequest<'a> {
    pub method: Method,
    /// Absolute URL including scheme, host and path
    pub url: String,
    pub headers: &'a [(String, String)],
    /// Pre-serialized JSON body
    pub body: Option<&'a [u8]>,
    /// Read timeout for this attempt
    pub timeout: Duration,
}

/// Raw response from a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HostResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Failure before any HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Sends a single request to a single host
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(
        &self,
        request: HostRequest<'_>,
    ) -> std::result::Result<HostResponse, TransportError>;
}

/// reqwest-backed transport
///
/// The connect timeout is fixed per client; the read timeout is set per request
/// so read and write traffic can use different budgets on one connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: HttpClient,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: HostRequest<'_>,
    ) -> std::result::Result<HostResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder =
            self.http_client.request(request.method, &request.url).timeout(request.timeout);

        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HostResponse { status, body: body.to_vec() })
    }
}
