// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for every pipeline stage.
//!
//! Each stage returns its own enum; the orchestrator folds them into an
//! [`ErrorInfo`] so a partial result can always be assembled.

use crate::types::{ErrorInfo, ErrorStage};

/// Suggestion attached to every fetch failure.
pub const MANUAL_PASTE_HINT: &str =
    "Open the report in your browser, copy the page source and submit it as pasted markup.";

/// Suggestion attached to empty or unrecognised markup.
pub const VERIFY_CONTENT_HINT: &str =
    "Check that the pasted text is the complete spy report page, including player and coordinates.";

/// Failures of the multi-strategy fetcher.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// URL outside the game's domain or not a spy report path. Never retried.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP error: status {0}")]
    HttpError(u16),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// 2xx response whose body is too short to be a report.
    #[error("Response too short: {len} bytes, need more than {min}")]
    InsufficientBody { len: usize, min: usize },

    #[error("Redirect error: {0}")]
    Redirect(String),

    /// Every strategy used up its attempts. Carries the last underlying error.
    #[error("All fetch strategies failed; last error: {0}")]
    AllStrategiesFailed(Box<FetchError>),
}

impl FetchError {
    /// Stable variant name for logs and [`ErrorInfo::kind`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) => "InvalidTarget",
            Self::Timeout(_) => "Timeout",
            Self::HttpError(_) => "HttpError",
            Self::NetworkError(_) => "NetworkError",
            Self::InsufficientBody { .. } => "InsufficientBody",
            Self::Redirect(_) => "Redirect",
            Self::AllStrategiesFailed(_) => "AllStrategiesFailed",
        }
    }

    /// Failures that happened before any server answered.
    pub fn is_network_origin(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::NetworkError(_))
    }

    /// The innermost error, unwrapping `AllStrategiesFailed`.
    pub fn last_error(&self) -> &FetchError {
        match self {
            Self::AllStrategiesFailed(inner) => inner.last_error(),
            other => other,
        }
    }
}

/// Failures of the report parser.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Markup is empty")]
    EmptyInput,

    /// Neither a player, a planet nor a coordinate triple was found.
    #[error("No player, planet or coordinates found in the report")]
    NoIdentity,

    #[error("Parser error: {0}")]
    ParserError(String),
}

impl ParseError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EmptyInput",
            Self::NoIdentity => "NoIdentity",
            Self::ParserError(_) => "ParserError",
        }
    }
}

/// Failures of the threat evaluator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Invalid threat model: {0}")]
    InvalidModel(String),
}

impl EvalError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidModel(_) => "InvalidModel",
        }
    }
}

/// Configuration could not be read or validated.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<&FetchError> for ErrorInfo {
    fn from(e: &FetchError) -> Self {
        let suggestion = match e {
            FetchError::InvalidTarget(_) => {
                Some("Use the link of a spy report on the game's own domain.".to_string())
            }
            _ => Some(MANUAL_PASTE_HINT.to_string()),
        };
        ErrorInfo {
            stage: ErrorStage::Fetch,
            kind: e.kind().to_string(),
            message: e.to_string(),
            suggestion,
        }
    }
}

impl From<&ParseError> for ErrorInfo {
    fn from(e: &ParseError) -> Self {
        ErrorInfo {
            stage: ErrorStage::Parse,
            kind: e.kind().to_string(),
            message: e.to_string(),
            suggestion: Some(VERIFY_CONTENT_HINT.to_string()),
        }
    }
}

impl From<&EvalError> for ErrorInfo {
    fn from(e: &EvalError) -> Self {
        ErrorInfo {
            stage: ErrorStage::Evaluate,
            kind: e.kind().to_string(),
            message: e.to_string(),
            suggestion: None,
        }
    }
}
