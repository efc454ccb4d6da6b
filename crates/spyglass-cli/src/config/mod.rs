// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration loading and resolution.

use std::path::PathBuf;

use spyglass::{ConfigError, SpyglassConfig};

pub const CONFIG_ENV: &str = "SPYGLASS_CONFIG";
pub const ALLOWED_HOSTS_ENV: &str = "SPYGLASS_ALLOWED_HOSTS";
pub const MIN_BODY_BYTES_ENV: &str = "SPYGLASS_MIN_BODY_BYTES";
pub const TIMEOUT_MS_ENV: &str = "SPYGLASS_TIMEOUT_MS";

#[derive(thiserror::Error, Debug)]
pub enum CliConfigError {
    #[error("Failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("{var}={value} is not a valid number")]
    InvalidOverride { var: &'static str, value: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Resolve the config file path.
///
/// `--config` flag, then `SPYGLASS_CONFIG`, then `./.spyglass/config.json`,
/// then `$HOME/.spyglass/config.json`. The default locations only count when
/// the file exists; `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd_config = PathBuf::from(".spyglass/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = default_config_path();
    home_config.exists().then_some(home_config)
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".spyglass").join("config.json")
}

/// Load the effective configuration: file (if any), then env overrides.
pub fn load_config(explicit: Option<&str>) -> Result<SpyglassConfig, CliConfigError> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!("Config: {}", path.display());
            SpyglassConfig::load(&path).map_err(|source| CliConfigError::Load {
                path: path.display().to_string(),
                source,
            })?
        }
        None => SpyglassConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    config.validate()?;
    Ok(config)
}

/// Apply `SPYGLASS_*` overrides read through `lookup`.
pub fn apply_env_overrides(
    config: &mut SpyglassConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CliConfigError> {
    if let Some(hosts) = lookup(ALLOWED_HOSTS_ENV) {
        config.target.allowed_hosts = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(value) = lookup(MIN_BODY_BYTES_ENV) {
        config.fetcher.min_body_bytes = parse_number(MIN_BODY_BYTES_ENV, &value)?;
    }
    if let Some(value) = lookup(TIMEOUT_MS_ENV) {
        config.fetcher.timeout_ms = parse_number(TIMEOUT_MS_ENV, &value)?;
    }
    Ok(())
}

/// Setup hint when no game host is allowed yet, so every fetch would fail.
pub fn missing_hosts_hint(config: &SpyglassConfig) -> Option<String> {
    config.target.allowed_hosts.is_empty().then(|| {
        format!(
            "No game hosts are configured, so every fetch is refused. \
             Set {ALLOWED_HOSTS_ENV}=<host>[,<host>...] or list them in target.allowed_hosts \
             of the config file."
        )
    })
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, CliConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| CliConfigError::InvalidOverride {
            var,
            value: value.to_string(),
        })
}
