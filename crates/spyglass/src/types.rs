// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types for spy reports as they move through the pipeline.
//!
//! [`RawReport`], [`ParsedReport`] and [`PipelineResult`] keep their fields
//! private: once built they are read through accessors only, so a value that
//! reached the caller is exactly the value the pipeline produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Raw markup ──────────────────────────────────────────────────────────────

/// Raw page source of a spy report, fetched or pasted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawReport {
    source_url: Option<String>,
    markup: String,
    /// Name of the fetch strategy that produced the markup. `None` in paste mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<String>,
}

impl RawReport {
    /// Markup supplied directly by the user.
    pub fn pasted(markup: impl Into<String>, source_url: Option<String>) -> Self {
        Self {
            source_url,
            markup: markup.into(),
            strategy: None,
        }
    }

    /// Markup obtained over the network by the named strategy.
    pub fn fetched(
        source_url: impl Into<String>,
        markup: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            source_url: Some(source_url.into()),
            markup: markup.into(),
            strategy: Some(strategy.into()),
        }
    }

    /// Placeholder for a URL whose markup could not be fetched.
    pub fn unfetched(source_url: impl Into<String>) -> Self {
        Self {
            source_url: Some(source_url.into()),
            markup: String::new(),
            strategy: None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn strategy(&self) -> Option<&str> {
        self.strategy.as_deref()
    }
}

// ── Parsed record ───────────────────────────────────────────────────────────

/// Galaxy/system/position triple as printed in the report, e.g. `555:849:4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coords {
    /// The triple exactly as matched (without parentheses).
    pub raw: String,
    /// Decomposed triple. `None` when any segment failed to parse as an integer.
    #[serde(flatten)]
    pub triple: Option<CoordTriple>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordTriple {
    pub galaxy: u32,
    pub system: u32,
    pub position: u32,
}

/// The five research levels a spy report exposes. Unmatched fields stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Research {
    pub spionage: Option<u32>,
    pub tarn: Option<u32>,
    pub invasion: Option<u32>,
    pub pluender: Option<u32>,
    pub sabotage: Option<u32>,
}

impl Research {
    /// Number of fields that carry a value.
    pub fn known_fields(&self) -> usize {
        [
            self.spionage,
            self.tarn,
            self.invasion,
            self.pluender,
            self.sabotage,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

/// A spy report reduced to the fields the dashboard ranks on.
///
/// At least one identity field (player, planet, coordinate string) is always
/// present; [`ParsedReport::new`] refuses to build a value without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedReport {
    target_player: Option<String>,
    planet_name: Option<String>,
    coords: Option<Coords>,
    research: Research,
}

impl ParsedReport {
    /// Build a report, or `None` if every identity field is empty.
    ///
    /// Blank strings are treated as absent.
    pub fn new(
        target_player: Option<String>,
        planet_name: Option<String>,
        coords: Option<Coords>,
        research: Research,
    ) -> Option<Self> {
        let target_player = target_player.filter(|s| !s.trim().is_empty());
        let planet_name = planet_name.filter(|s| !s.trim().is_empty());
        let coords = coords.filter(|c| !c.raw.trim().is_empty());

        if target_player.is_none() && planet_name.is_none() && coords.is_none() {
            return None;
        }

        Some(Self {
            target_player,
            planet_name,
            coords,
            research,
        })
    }

    pub fn target_player(&self) -> Option<&str> {
        self.target_player.as_deref()
    }

    pub fn planet_name(&self) -> Option<&str> {
        self.planet_name.as_deref()
    }

    pub fn coords(&self) -> Option<&Coords> {
        self.coords.as_ref()
    }

    pub fn research(&self) -> &Research {
        &self.research
    }
}

// ── Threat ──────────────────────────────────────────────────────────────────

/// Threat classification derived from a report's research levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatEvaluation {
    /// Band label, e.g. "High".
    pub label: String,
    /// Display color token of the band, e.g. "orange".
    pub color_token: String,
    /// Score in `[0, 100]`.
    pub percentage: u8,
}

// ── Fetch attempts ──────────────────────────────────────────────────────────

/// One try of one strategy. Diagnostic only; never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub strategy: String,
    /// 1-based attempt number within the strategy.
    pub attempt_index: u32,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Accepted response; the body itself moved into the [`RawReport`].
    Success { byte_len: usize },
    Failure { kind: String, message: String },
}

impl FetchAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}

// ── Pipeline result ─────────────────────────────────────────────────────────

/// Stage at which a submission stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Fetch,
    Parse,
    Evaluate,
    Cancelled,
}

/// Failure description attached to an unsuccessful [`PipelineResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub stage: ErrorStage,
    /// Stable variant name, e.g. `AllStrategiesFailed`.
    pub kind: String,
    pub message: String,
    /// What the user can do next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// States of a single submission.
///
/// ```text
/// Idle -> Fetching -> Parsing -> Evaluating -> Done(Success)
///            |           |            \-> Done(EvalFailed)
///            |           \-> Done(ParseFailed)
///            \-> Done(FetchFailed) | Done(Cancelled)
/// PastedMarkup -> Parsing -> ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "outcome")]
pub enum PipelineState {
    Idle,
    PastedMarkup,
    Fetching,
    Parsing,
    Evaluating,
    Done(DoneState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneState {
    Success,
    FetchFailed,
    ParseFailed,
    EvalFailed,
    Cancelled,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::PastedMarkup => write!(f, "pasted markup"),
            Self::Fetching => write!(f, "fetching"),
            Self::Parsing => write!(f, "parsing"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Done(DoneState::Success) => write!(f, "done"),
            Self::Done(DoneState::FetchFailed) => write!(f, "done (fetch failed)"),
            Self::Done(DoneState::ParseFailed) => write!(f, "done (parse failed)"),
            Self::Done(DoneState::EvalFailed) => write!(f, "done (evaluation failed)"),
            Self::Done(DoneState::Cancelled) => write!(f, "done (cancelled)"),
        }
    }
}

/// Terminal artifact of one submission, handed to persistence by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    submission_id: Uuid,
    success: bool,
    state: PipelineState,
    raw: RawReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsed: Option<ParsedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<ThreatEvaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    #[serde(skip)]
    attempts: Vec<FetchAttempt>,
}

impl PipelineResult {
    pub(crate) fn succeeded(
        submission_id: Uuid,
        raw: RawReport,
        parsed: ParsedReport,
        evaluation: ThreatEvaluation,
        attempts: Vec<FetchAttempt>,
    ) -> Self {
        Self {
            submission_id,
            success: true,
            state: PipelineState::Done(DoneState::Success),
            raw,
            parsed: Some(parsed),
            evaluation: Some(evaluation),
            error: None,
            attempts,
        }
    }

    pub(crate) fn failed(
        submission_id: Uuid,
        done: DoneState,
        raw: RawReport,
        parsed: Option<ParsedReport>,
        error: ErrorInfo,
        attempts: Vec<FetchAttempt>,
    ) -> Self {
        Self {
            submission_id,
            success: false,
            state: PipelineState::Done(done),
            raw,
            parsed,
            evaluation: None,
            error: Some(error),
            attempts,
        }
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn raw(&self) -> &RawReport {
        &self.raw
    }

    pub fn parsed(&self) -> Option<&ParsedReport> {
        self.parsed.as_ref()
    }

    pub fn evaluation(&self) -> Option<&ThreatEvaluation> {
        self.evaluation.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Every fetch attempt made for this submission, in order. Empty in paste mode.
    pub fn attempts(&self) -> &[FetchAttempt] {
        &self.attempts
    }

    /// Attempts that failed before the accepted one (or all of them, on failure).
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.is_success()).count()
    }
}
