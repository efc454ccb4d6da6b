// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Injected configuration for the pipeline.
//!
//! Everything the fetcher and evaluator need (allowed hosts, strategy list,
//! relay endpoints, retry constants, threat weights) lives here and is passed
//! in at construction time. All sections default, so a config file only needs
//! the keys it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::strategy::{default_strategies, Strategy};
use crate::error::ConfigError;
use crate::threat::ThreatModel;

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyglassConfig {
    pub target: TargetPolicy,
    pub fetcher: FetcherConfig,
    pub strategies: Vec<Strategy>,
    pub threat: ThreatModel,
}

impl Default for SpyglassConfig {
    fn default() -> Self {
        Self {
            target: TargetPolicy::default(),
            fetcher: FetcherConfig::default(),
            strategies: default_strategies(),
            threat: ThreatModel::default(),
        }
    }
}

impl SpyglassConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetcher.validate()?;
        if self.strategies.is_empty() {
            return Err(ConfigError::Invalid("at least one strategy is required".into()));
        }
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        self.threat
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

// ── Target policy ───────────────────────────────────────────────────────────

/// Which URLs the fetcher is allowed to request at all.
///
/// With no allowed hosts configured every URL is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetPolicy {
    /// Game hosts. Subdomains of a listed host are accepted too.
    pub allowed_hosts: Vec<String>,
    /// Case-insensitive substrings, one of which the URL path must contain.
    pub report_path_markers: Vec<String>,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            report_path_markers: ["spy", "spio", "report", "bericht"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl TargetPolicy {
    /// Policy for a single game host with the default path markers.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            allowed_hosts: vec![host.into()],
            ..Self::default()
        }
    }

    /// Whether `host` equals or is a subdomain of an allowed host.
    pub fn host_allowed(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.trim().trim_end_matches('.').to_ascii_lowercase();
            !allowed.is_empty()
                && (host == allowed || host.ends_with(&format!(".{allowed}")))
        })
    }

    pub fn path_allowed(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        self.report_path_markers
            .iter()
            .any(|m| !m.is_empty() && path.contains(&m.to_ascii_lowercase()))
    }
}

// ── Fetcher policy ──────────────────────────────────────────────────────────

/// When relay strategies may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// Only after the last direct failure was a timeout or network error.
    #[default]
    OnNetworkError,
    Always,
}

/// Retry, timeout and acceptance constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Attempts per strategy.
    pub max_attempts: u32,
    /// Per-attempt timeout, including redirect hops.
    pub timeout_ms: u64,
    /// Delay after the first failed attempt; doubles per attempt.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Bodies must be strictly longer than this to count as a report.
    pub min_body_bytes: usize,
    pub max_redirects: u32,
    pub relay_policy: RelayPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_ms: 12_000,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            min_body_bytes: 512,
            max_redirects: 5,
            relay_policy: RelayPolicy::OnNetworkError,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("fetcher.max_attempts must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetcher.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
