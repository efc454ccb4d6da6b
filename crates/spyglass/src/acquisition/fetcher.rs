// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Multi-strategy fetcher for spy report pages.
//!
//! Walks the configured strategy list in order. Each strategy gets up to
//! `max_attempts` tries with exponential backoff between them; every try is
//! bounded by the per-attempt timeout and follows redirects itself. The first
//! response that is 2xx and longer than `min_body_bytes` wins and ends the
//! walk. Relay strategies only run when the policy allows it (by default,
//! after direct requests failed before reaching a server).
//!
//! Attempts run strictly one after another. Dropping the future returned by
//! [`Fetcher::fetch`] drops the in-flight request with it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use crate::acquisition::strategy::Strategy;
use crate::acquisition::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest,
};
use crate::config::{FetcherConfig, RelayPolicy, SpyglassConfig, TargetPolicy};
use crate::error::FetchError;
use crate::progress::{ProgressEventKind, ProgressReporter};
use crate::types::{AttemptOutcome, FetchAttempt, RawReport};

/// Result of a fetch together with the log of every attempt made.
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: Result<RawReport, FetchError>,
    pub attempts: Vec<FetchAttempt>,
}

/// Fetches spy report markup through an ordered list of strategies.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    target: TargetPolicy,
    config: FetcherConfig,
    strategies: Arc<[Strategy]>,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        target: TargetPolicy,
        config: FetcherConfig,
        strategies: Vec<Strategy>,
    ) -> Self {
        Self {
            transport,
            target,
            config,
            strategies: strategies.into(),
        }
    }

    /// Fetcher over the production reqwest transport.
    pub fn from_config(config: &SpyglassConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(
            Arc::new(transport),
            config.target.clone(),
            config.fetcher.clone(),
            config.strategies.clone(),
        ))
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Check that `url` points at a spy report on an allowed game host.
    ///
    /// Runs before any network activity.
    pub fn validate_target(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| FetchError::InvalidTarget(format!("'{url}' is not a valid URL: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidTarget(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidTarget(format!("'{url}' has no host")))?;
        if self.target.allowed_hosts.is_empty() {
            return Err(FetchError::InvalidTarget(format!(
                "no game hosts are configured, so '{host}' cannot be fetched; \
                 list the game's host in target.allowed_hosts"
            )));
        }
        if !self.target.host_allowed(host) {
            return Err(FetchError::InvalidTarget(format!(
                "host '{host}' is not a game host"
            )));
        }

        // Markers count in the path only; a query string is free text.
        if !self.target.path_allowed(parsed.path()) {
            return Err(FetchError::InvalidTarget(format!(
                "'{}' is not a spy report",
                parsed.path()
            )));
        }

        Ok(parsed)
    }

    /// Fetch the report at `url`.
    pub async fn fetch(&self, url: &str) -> Result<RawReport, FetchError> {
        self.fetch_logged(url, &mut ProgressReporter::silent())
            .await
            .result
    }

    /// Fetch the report at `url`, recording every attempt and emitting progress.
    pub async fn fetch_logged(&self, url: &str, progress: &mut ProgressReporter) -> FetchOutcome {
        let target = match self.validate_target(url) {
            Ok(target) => target,
            Err(e) => {
                warn!(url, error = %e, "rejected fetch target");
                return FetchOutcome {
                    result: Err(e),
                    attempts: Vec::new(),
                };
            }
        };

        let mut attempts = Vec::new();
        let mut last_error: Option<FetchError> = None;
        let mut last_direct_error: Option<FetchError> = None;
        let mut direct_tried = false;
        let mut relays_skipped = false;

        for strategy in self.strategies.iter() {
            if strategy.is_relay() {
                if let Some(reason) = self.relay_block(direct_tried, last_direct_error.as_ref()) {
                    if !relays_skipped {
                        info!(reason = %reason, "skipping relay strategies");
                        progress.emit(ProgressEventKind::RelaysSkipped { reason });
                        relays_skipped = true;
                    }
                    continue;
                }
            } else {
                direct_tried = true;
            }

            for attempt in 1..=self.config.max_attempts {
                progress.emit(ProgressEventKind::AttemptStarted {
                    strategy: strategy.name.clone(),
                    attempt,
                    max_attempts: self.config.max_attempts,
                });
                debug!(strategy = %strategy.name, attempt, "fetch attempt");
                let started_at = Utc::now();

                match self.attempt(strategy, &target).await {
                    Ok(body) => {
                        let byte_len = body.len();
                        info!(strategy = %strategy.name, attempt, byte_len, "report fetched");
                        attempts.push(FetchAttempt {
                            strategy: strategy.name.clone(),
                            attempt_index: attempt,
                            started_at,
                            outcome: AttemptOutcome::Success { byte_len },
                        });
                        progress.emit(ProgressEventKind::Accepted {
                            strategy: strategy.name.clone(),
                            byte_len,
                        });
                        return FetchOutcome {
                            result: Ok(RawReport::fetched(
                                target.as_str(),
                                body,
                                strategy.name.clone(),
                            )),
                            attempts,
                        };
                    }
                    Err(e) => {
                        warn!(strategy = %strategy.name, attempt, error = %e, "fetch attempt failed");
                        attempts.push(FetchAttempt {
                            strategy: strategy.name.clone(),
                            attempt_index: attempt,
                            started_at,
                            outcome: AttemptOutcome::Failure {
                                kind: e.kind().to_string(),
                                message: e.to_string(),
                            },
                        });
                        progress.emit(ProgressEventKind::AttemptFailed {
                            strategy: strategy.name.clone(),
                            attempt,
                            error: e.to_string(),
                        });
                        if !strategy.is_relay() {
                            last_direct_error = Some(e.clone());
                        }
                        last_error = Some(e);

                        if attempt < self.config.max_attempts {
                            tokio::time::sleep(self.config.backoff_delay(attempt)).await;
                        }
                    }
                }
            }
            warn!(strategy = %strategy.name, "strategy exhausted");
        }

        let last = last_error
            .unwrap_or_else(|| FetchError::NetworkError("no strategy was attempted".to_string()));
        FetchOutcome {
            result: Err(FetchError::AllStrategiesFailed(Box::new(last))),
            attempts,
        }
    }

    /// Why relays may not run yet, or `None` if they may.
    fn relay_block(&self, direct_tried: bool, last_direct: Option<&FetchError>) -> Option<String> {
        match self.config.relay_policy {
            RelayPolicy::Always => None,
            RelayPolicy::OnNetworkError if !direct_tried => None,
            RelayPolicy::OnNetworkError => match last_direct {
                Some(e) if e.is_network_origin() => None,
                Some(e) => Some(format!("direct requests reached the server ({})", e.kind())),
                None => Some("no direct failure recorded".to_string()),
            },
        }
    }

    /// One attempt: a request plus its redirect hops, under the attempt timeout.
    async fn attempt(&self, strategy: &Strategy, target: &Url) -> Result<String, FetchError> {
        match tokio::time::timeout(self.config.timeout(), self.follow(strategy, target)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.config.timeout_ms)),
        }
    }

    async fn follow(&self, strategy: &Strategy, target: &Url) -> Result<String, FetchError> {
        let headers: Vec<(String, String)> = strategy
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut current = strategy.request_url(target.as_str());

        for hop in 0..=self.config.max_redirects {
            let request = TransportRequest {
                url: current.clone(),
                headers: headers.clone(),
                timeout: self.config.timeout(),
            };
            let resp = self.transport.get(&request).await.map_err(|e| match e {
                TransportError::Timeout => FetchError::Timeout(self.config.timeout_ms),
                TransportError::Network(msg) => FetchError::NetworkError(msg),
            })?;

            match resp.status {
                200..=299 => {
                    let len = resp.body.len();
                    if len > self.config.min_body_bytes {
                        return Ok(resp.body);
                    }
                    return Err(FetchError::InsufficientBody {
                        len,
                        min: self.config.min_body_bytes,
                    });
                }
                300..=399 if resp.location.is_some() => {
                    let location = resp.location.unwrap_or_default();
                    let next = self.redirect_target(strategy, &current, &location)?;
                    debug!(strategy = %strategy.name, hop, to = %next, "following redirect");
                    current = next.into();
                }
                status => return Err(FetchError::HttpError(status)),
            }
        }

        Err(FetchError::Redirect(format!(
            "more than {} redirects",
            self.config.max_redirects
        )))
    }

    fn redirect_target(
        &self,
        strategy: &Strategy,
        current: &str,
        location: &str,
    ) -> Result<Url, FetchError> {
        let next = Url::parse(current)
            .and_then(|base| base.join(location))
            .map_err(|e| FetchError::Redirect(format!("bad Location '{location}': {e}")))?;

        if !matches!(next.scheme(), "http" | "https") {
            return Err(FetchError::Redirect(format!(
                "redirect to unsupported scheme '{}'",
                next.scheme()
            )));
        }
        // Relays redirect within their own infrastructure; direct requests must stay on the game.
        if !strategy.is_relay() && !self.target.host_allowed(next.host_str().unwrap_or_default()) {
            return Err(FetchError::Redirect(format!(
                "redirect to '{next}' leaves the game host"
            )));
        }
        Ok(next)
    }
}
