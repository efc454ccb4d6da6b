// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spy report parser: markup in, [`ParsedReport`] or [`ParseError`] out.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::error::ParseError;
use crate::extraction::patterns::Patterns;
use crate::extraction::text::html_to_text;
use crate::types::ParsedReport;

/// Parse a spy report page.
///
/// Succeeds whenever a player, a planet or a coordinate triple is found;
/// research levels that are missing stay `None`. A page without any identity
/// field fails with [`ParseError::NoIdentity`] even if research labels are
/// present.
pub fn parse(markup: &str) -> Result<ParsedReport, ParseError> {
    if markup.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let patterns = Patterns::compiled()?;

    let extracted = catch_unwind(AssertUnwindSafe(|| extract(patterns, markup)))
        .map_err(|payload| ParseError::ParserError(panic_message(payload.as_ref())))??;

    debug!(
        player = extracted.target_player().unwrap_or("-"),
        planet = extracted.planet_name().unwrap_or("-"),
        research_fields = extracted.research().known_fields(),
        "parsed spy report"
    );
    Ok(extracted)
}

fn extract(patterns: &Patterns, markup: &str) -> Result<ParsedReport, ParseError> {
    let text = html_to_text(markup);
    let player = patterns.player(&text);
    let (planet, coords) = patterns.location(&text);
    let research = patterns.research(&text);

    ParsedReport::new(player, planet, coords, research).ok_or(ParseError::NoIdentity)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("extraction panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("extraction panicked: {s}")
    } else {
        "extraction panicked".to_string()
    }
}
