// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch strategies: one header set, optionally routed through a relay.
//!
//! The list is read-only configuration shared by every submission. Order
//! matters: the fetcher walks it front to back and stops at the first
//! accepted response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placeholder replaced by the percent-encoded target URL.
const URL_PLACEHOLDER: &str = "{url}";
/// Placeholder replaced by the target URL verbatim (path-suffix relays).
const RAW_URL_PLACEHOLDER: &str = "{raw_url}";

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/131.0.0.0 Safari/537.36";
const FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0";

/// One way of requesting a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Shown in progress messages and attempt logs.
    pub name: String,
    /// Request headers, sent in addition to the transport defaults.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Relay URL template containing `{url}` or `{raw_url}`. `None` for direct requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
}

impl Strategy {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers: BTreeMap::new(),
            relay: None,
        }
    }

    pub fn relay(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers: BTreeMap::new(),
            relay: Some(template.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_relay(&self) -> bool {
        self.relay.is_some()
    }

    /// URL to request for `target` under this strategy.
    pub fn request_url(&self, target: &str) -> String {
        match &self.relay {
            None => target.to_string(),
            Some(template) => {
                let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
                template
                    .replace(URL_PLACEHOLDER, &encoded)
                    .replace(RAW_URL_PLACEHOLDER, target)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("strategy name must not be empty".into()));
        }
        if let Some(template) = &self.relay {
            if !template.contains(URL_PLACEHOLDER) && !template.contains(RAW_URL_PLACEHOLDER) {
                return Err(ConfigError::Invalid(format!(
                    "relay '{}' must contain {URL_PLACEHOLDER} or {RAW_URL_PLACEHOLDER}",
                    self.name
                )));
            }
            let sample = self.request_url("https://sample.invalid/spy");
            url::Url::parse(&sample).map_err(|e| {
                ConfigError::Invalid(format!("relay '{}' is not a valid URL: {e}", self.name))
            })?;
        }
        Ok(())
    }
}

/// Built-in strategy chain: three direct header profiles, then public relays.
pub fn default_strategies() -> Vec<Strategy> {
    vec![
        Strategy::direct("direct"),
        Strategy::direct("alternate-agent")
            .with_header("User-Agent", FIREFOX_UA)
            .with_header("Accept-Language", "de-DE,de;q=0.9,en;q=0.8")
            .with_header("Accept-Encoding", "identity"),
        Strategy::direct("browser")
            .with_header("User-Agent", CHROME_UA)
            .with_header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .with_header("Accept-Language", "de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7")
            .with_header("Cache-Control", "no-cache")
            .with_header("Pragma", "no-cache")
            .with_header("Upgrade-Insecure-Requests", "1")
            .with_header("Sec-Fetch-Dest", "document")
            .with_header("Sec-Fetch-Mode", "navigate")
            .with_header("Sec-Fetch-Site", "none")
            .with_header("Sec-Fetch-User", "?1"),
        Strategy::relay("relay-allorigins", "https://api.allorigins.win/raw?url={url}"),
        Strategy::relay("relay-corsproxy", "https://corsproxy.io/?url={url}"),
        Strategy::relay("relay-codetabs", "https://api.codetabs.com/v1/proxy?quest={url}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_request_url_is_target() {
        let s = Strategy::direct("direct");
        assert_eq!(
            s.request_url("https://game.example/spy?id=7"),
            "https://game.example/spy?id=7"
        );
    }

    #[test]
    fn test_query_relay_encodes_target() {
        let s = Strategy::relay("r", "https://relay.example/raw?url={url}");
        assert_eq!(
            s.request_url("https://game.example/spy?id=7&x=1"),
            "https://relay.example/raw?url=https%3A%2F%2Fgame.example%2Fspy%3Fid%3D7%26x%3D1"
        );
    }

    #[test]
    fn test_path_relay_appends_raw_target() {
        let s = Strategy::relay("r", "https://relay.example/{raw_url}");
        assert_eq!(
            s.request_url("https://game.example/spy/7"),
            "https://relay.example/https://game.example/spy/7"
        );
    }

    #[test]
    fn test_defaults_are_valid_and_direct_first() {
        let strategies = default_strategies();
        for s in &strategies {
            s.validate().unwrap();
        }
        let first_relay = strategies.iter().position(Strategy::is_relay).unwrap();
        assert!(strategies[..first_relay].iter().all(|s| !s.is_relay()));
        assert!(strategies[first_relay..].iter().all(Strategy::is_relay));
    }

    #[test]
    fn test_relay_without_placeholder_rejected() {
        let s = Strategy::relay("broken", "https://relay.example/raw");
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_strategy_json_shape() {
        let s: Strategy = serde_json::from_str(
            r#"{ "name": "custom", "headers": { "User-Agent": "x" } }"#,
        )
        .unwrap();
        assert!(!s.is_relay());
        assert_eq!(s.headers.get("User-Agent").map(String::as_str), Some("x"));
    }
}
