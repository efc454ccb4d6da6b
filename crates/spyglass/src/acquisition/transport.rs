// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-hop HTTP GET behind a trait.
//!
//! The fetcher never talks to reqwest directly. A [`Transport`] performs one
//! request without following redirects; the fetcher follows `Location`
//! itself so it can bound hops and vet redirect targets.

use std::time::Duration;

use async_trait::async_trait;

/// User-Agent sent when a strategy does not set its own.
pub const DEFAULT_USER_AGENT: &str = concat!("spyglass/", env!("CARGO_PKG_VERSION"));

/// One outgoing GET.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Response to a single hop.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// `Location` header, present on redirects.
    pub location: Option<String>,
    pub body: String,
}

/// Failure before a status line was received.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

/// Performs one GET. Implementations must not follow redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.text().await.map_err(classify)?;

        Ok(TransportResponse {
            status,
            location,
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}
