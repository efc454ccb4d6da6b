// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rendering of pipeline results for the terminal.

use std::fmt::Write;

use spyglass::{AttemptOutcome, PipelineResult};

/// Human-readable summary of a result.
pub fn render_human(result: &PipelineResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Submission {}", result.submission_id());
    let _ = writeln!(out, "  State: {}", result.state());

    if let Some(source) = result.raw().source_url() {
        let _ = writeln!(out, "  Source: {source}");
    }
    if let Some(strategy) = result.raw().strategy() {
        let _ = writeln!(out, "  Fetched via: {strategy}");
    }

    if let Some(parsed) = result.parsed() {
        let _ = writeln!(out, "  Player: {}", parsed.target_player().unwrap_or("-"));
        let _ = writeln!(out, "  Planet: {}", parsed.planet_name().unwrap_or("-"));
        let coords = parsed.coords().map(|c| c.raw.as_str()).unwrap_or("-");
        let _ = writeln!(out, "  Coordinates: {coords}");

        let r = parsed.research();
        let level = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = writeln!(
            out,
            "  Research: spionage {} | tarn {} | invasion {} | pluender {} | sabotage {}",
            level(r.spionage),
            level(r.tarn),
            level(r.invasion),
            level(r.pluender),
            level(r.sabotage)
        );
    }

    if let Some(eval) = result.evaluation() {
        let _ = writeln!(
            out,
            "  Threat: {} ({}%, {})",
            eval.label, eval.percentage, eval.color_token
        );
    }

    if !result.attempts().is_empty() {
        let _ = writeln!(out, "  Attempts:");
        for attempt in result.attempts() {
            let detail = match &attempt.outcome {
                AttemptOutcome::Success { byte_len } => format!("ok, {byte_len} bytes"),
                AttemptOutcome::Failure { message, .. } => message.clone(),
            };
            let _ = writeln!(
                out,
                "    {} #{}: {detail}",
                attempt.strategy, attempt.attempt_index
            );
        }
    }

    if let Some(error) = result.error() {
        let _ = writeln!(out, "  Error: {}", error.message);
        if let Some(hint) = &error.suggestion {
            let _ = writeln!(out, "  Hint: {hint}");
        }
    }

    out
}

/// Pretty JSON of a result (without the attempt log).
pub fn render_json(result: &PipelineResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
