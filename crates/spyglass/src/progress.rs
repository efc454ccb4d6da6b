// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for submission status.
//!
//! The pipeline emits `ProgressEvent`s (state changes, strategy attempts)
//! through a `tokio::sync::broadcast` channel to whoever is listening: a UI
//! status line, the CLI log. Events are advisory; when no subscriber exists
//! they are silently dropped.

use serde::{Deserialize, Serialize};

use crate::types::PipelineState;

/// A progress event emitted while a submission runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The submission this event belongs to.
    pub submission_id: String,
    /// Monotonically increasing sequence number within the submission.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// The submission moved to a new state.
    StateChanged { state: PipelineState },
    /// A strategy attempt is about to be sent.
    AttemptStarted {
        strategy: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// An attempt failed; another may follow.
    AttemptFailed {
        strategy: String,
        attempt: u32,
        error: String,
    },
    /// Relay strategies were not tried.
    RelaysSkipped { reason: String },
    /// A response was accepted as the report.
    Accepted { strategy: String, byte_len: usize },
}

impl std::fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateChanged { state } => write!(f, "State: {state}"),
            Self::AttemptStarted {
                strategy,
                attempt,
                max_attempts,
            } => write!(f, "Trying {strategy} (attempt {attempt}/{max_attempts})"),
            Self::AttemptFailed {
                strategy,
                attempt,
                error,
            } => write!(f, "{strategy} attempt {attempt} failed: {error}"),
            Self::RelaysSkipped { reason } => write!(f, "Skipping relays: {reason}"),
            Self::Accepted { strategy, byte_len } => {
                write!(f, "Report received via {strategy} ({byte_len} bytes)")
            }
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// A default chain of six strategies with three attempts each produces well
/// under 64 events per submission.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Per-submission emitter that stamps events with id and sequence number.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    submission_id: String,
    seq: u64,
}

impl ProgressReporter {
    pub fn new(tx: Option<ProgressSender>, submission_id: impl Into<String>) -> Self {
        Self {
            tx,
            submission_id: submission_id.into(),
            seq: 0,
        }
    }

    /// Reporter that drops every event.
    pub fn silent() -> Self {
        Self::new(None, String::new())
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&mut self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            self.seq += 1;
            let _ = sender.send(ProgressEvent {
                submission_id: self.submission_id.clone(),
                seq: self.seq,
                event,
            });
        }
    }

    pub fn state(&mut self, state: PipelineState) {
        self.emit(ProgressEventKind::StateChanged { state });
    }
}
