// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Coordinate and field extractor.
//!
//! Pure functions over normalized report text. The report layout is not
//! stable, so every field is found by tolerant label patterns rather than by
//! position: an ordered list of alternatives per field, first match wins.
//!
//! Patterns are compiled once per process. Compilation failures are kept and
//! returned as [`ParseError::ParserError`] instead of panicking.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::types::{CoordTriple, Coords, Research};

// ── Pattern tables ──────────────────────────────────────────────────────────

/// Labels introducing the spied player's name, most specific first.
const PLAYER_LABELS: &[&str] = &[
    r"the player who was spied (?:up)?on is:?",
    r"the player who was spied is:?",
    r"der ausspionierte spieler ist:?",
    r"ausspionierter spieler:",
    r"spieler:",
    r"player:",
    r"ziel:",
    r"target:",
];

/// Characters that end a player name.
const NAME_DELIMITERS: &[char] = &['(', '[', '<', '>', ',', ';', '|'];

/// Longest player name taken from a line, in words.
const MAX_NAME_WORDS: usize = 3;

/// Word before `(g:s:p)` that is a label, not a planet name.
const NOT_PLANET_NAMES: &[&str] = &[
    "koordinaten",
    "coordinates",
    "coords",
    "position",
    "planet",
    "planeten",
];

/// Research field synonyms, most specific first.
const SPIONAGE_LABELS: &[&str] = &[
    r"spionageeinheit(?:en)?",
    r"spionage[- ]einheit(?:en)?",
    r"spionagetechnik",
    r"espionage[- ]?units?",
    r"spy[- ]?units?",
    r"spionage",
    r"espionage",
    r"spy",
];
const TARN_LABELS: &[&str] = &[
    r"tarneinheit(?:en)?",
    r"tarn[- ]einheit(?:en)?",
    r"tarntechnik",
    r"cloaking[- ]?units?",
    r"stealth[- ]?units?",
    r"tarnung",
    r"tarn",
    r"cloaking",
    r"stealth",
];
const INVASION_LABELS: &[&str] = &[
    r"invasionseinheit(?:en)?",
    r"invasions?[- ]einheit(?:en)?",
    r"invasionstechnik",
    r"invasion[- ]?units?",
    r"invasion",
];
const PLUENDER_LABELS: &[&str] = &[
    r"pl(?:ü|ue|u)ndereinheit(?:en)?",
    r"pl(?:ü|ue|u)nder[- ]einheit(?:en)?",
    r"looting[- ]?units?",
    r"plunder[- ]?units?",
    r"pl(?:ü|ue|u)nderung",
    r"pl(?:ü|ue|u)nder",
    r"looting",
];
const SABOTAGE_LABELS: &[&str] = &[
    r"sabotageeinheit(?:en)?",
    r"sabotage[- ]einheit(?:en)?",
    r"sabotagetechnik",
    r"sabotage[- ]?units?",
    r"sabotage",
];

/// Compiled extractor patterns.
#[derive(Debug)]
pub struct Patterns {
    players: Vec<Regex>,
    location: Regex,
    /// A coordinate triple at the start of the text.
    coords_ahead: Regex,
    /// A line holding nothing but a research label.
    bare_label: Regex,
    spionage: Vec<Regex>,
    tarn: Vec<Regex>,
    invasion: Vec<Regex>,
    pluender: Vec<Regex>,
    sabotage: Vec<Regex>,
}

impl Patterns {
    /// Process-wide compiled patterns.
    pub fn compiled() -> Result<&'static Patterns, ParseError> {
        static PATTERNS: OnceLock<Result<Patterns, String>> = OnceLock::new();
        PATTERNS
            .get_or_init(|| Patterns::build().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| ParseError::ParserError(format!("pattern compilation failed: {e}")))
    }

    fn build() -> Result<Self, regex::Error> {
        let players = PLAYER_LABELS
            .iter()
            .map(|label| Regex::new(&format!(r"(?i)\b{label}[ \t]*(?:\n[ \t]*)?([^\n]*)")))
            .collect::<Result<Vec<_>, _>>()?;

        // Several words only when the name starts its line, e.g. "New Berlin (1:2:3)".
        let location = Regex::new(
            r"(?m)(?:^[ \t]*(?P<multi>(?:[\p{L}\p{N}_'.\-]+[ \t]+){1,2}[\p{L}\p{N}_'.\-]+)[ \t]*|(?P<single>[\p{L}\p{N}_'.\-]+)?\s*)\(\s*(?P<g>[0-9]+)\s*:\s*(?P<s>[0-9]+)\s*:\s*(?P<p>[0-9]+)\s*\)",
        )?;
        let coords_ahead = Regex::new(r"^\s*\(\s*[0-9]+\s*:\s*[0-9]+\s*:\s*[0-9]+\s*\)")?;

        let all_labels = [
            SPIONAGE_LABELS,
            TARN_LABELS,
            INVASION_LABELS,
            PLUENDER_LABELS,
            SABOTAGE_LABELS,
        ]
        .concat()
        .join("|");
        let bare_label = Regex::new(&format!(r"(?i)^[ \t]*(?:{all_labels})[ \t]*[:=]?[ \t]*$"))?;

        Ok(Self {
            players,
            location,
            coords_ahead,
            bare_label,
            spionage: research_patterns(SPIONAGE_LABELS)?,
            tarn: research_patterns(TARN_LABELS)?,
            invasion: research_patterns(INVASION_LABELS)?,
            pluender: research_patterns(PLUENDER_LABELS)?,
            sabotage: research_patterns(SABOTAGE_LABELS)?,
        })
    }

    // ── Identity ────────────────────────────────────────────────────────────

    /// Name of the spied player, from the first label that matches.
    pub fn player(&self, text: &str) -> Option<String> {
        self.players.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .find_map(|rest| self.player_name(rest.as_str()))
        })
    }

    /// Name at the start of `rest`, the remainder of a label's line.
    ///
    /// The whole line up to a delimiter is taken when it looks like a name
    /// (a few words, no digits-only word, no further label). Otherwise only
    /// the first token. A name followed by a coordinate triple is a planet.
    fn player_name(&self, rest: &str) -> Option<String> {
        let end = rest.find(NAME_DELIMITERS).unwrap_or(rest.len());
        let segment = &rest[..end];
        let words: Vec<&str> = segment.split_whitespace().collect();
        let whole_line = !words.is_empty()
            && words.len() <= MAX_NAME_WORDS
            && !segment.contains(&[':', '='][..])
            && !words.iter().any(|w| w.chars().all(|c| c.is_ascii_digit()));

        let (name, after) = if whole_line {
            (segment, &rest[end..])
        } else {
            let trimmed = segment.trim_start();
            let len = trimmed
                .find(|c: char| c.is_whitespace() || c == ':' || c == '=')
                .unwrap_or(trimmed.len());
            let offset = segment.len() - trimmed.len() + len;
            (&trimmed[..len], &rest[offset..])
        };

        if self.coords_ahead.is_match(after) {
            return None;
        }
        let name = name.trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ':' | '"' | '\''));
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Planet name and coordinates from the first `(g:s:p)` triple.
    pub fn location(&self, text: &str) -> (Option<String>, Option<Coords>) {
        let Some(caps) = self.location.captures(text) else {
            return (None, None);
        };

        let planet = caps
            .name("multi")
            .or_else(|| caps.name("single"))
            .map(|m| {
                m.as_str()
                    .split_whitespace()
                    .map(|w| w.trim_matches(|c: char| matches!(c, '.' | '-' | '\'')))
                    .skip_while(|w| w.is_empty() || NOT_PLANET_NAMES.contains(&w.to_lowercase().as_str()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|name| !name.is_empty());

        let raw = [&caps["g"], &caps["s"], &caps["p"]].join(":");
        let coords = Coords {
            triple: split_coords(&raw),
            raw,
        };
        (planet, Some(coords))
    }

    // ── Research ────────────────────────────────────────────────────────────

    pub fn research(&self, text: &str) -> Research {
        Research {
            spionage: self.level(&self.spionage, text),
            tarn: self.level(&self.tarn, text),
            invasion: self.level(&self.invasion, text),
            pluender: self.level(&self.pluender, text),
            sabotage: self.level(&self.sabotage, text),
        }
    }

    fn level(&self, patterns: &[Regex], text: &str) -> Option<u32> {
        patterns.iter().find_map(|re| {
            re.captures_iter(text).find_map(|caps| {
                let label = caps.get(0)?;
                let value = caps.get(2)?;
                if caps.get(1).is_some() && !self.stacked_pair(text, label.start(), value.end()) {
                    return None;
                }
                value.as_str().parse().ok()
            })
        })
    }

    /// Label and value on consecutive lines belong together only when each
    /// fills its own line and the line above is not another bare label. A run
    /// of bare labels is a table header whose values sit in another row.
    fn stacked_pair(&self, text: &str, label_start: usize, value_end: usize) -> bool {
        let line_start = text[..label_start].rfind('\n').map_or(0, |i| i + 1);
        if !text[line_start..label_start].trim().is_empty() {
            return false;
        }
        let line_end = text[value_end..]
            .find('\n')
            .map_or(text.len(), |i| value_end + i);
        if !text[value_end..line_end].trim().is_empty() {
            return false;
        }
        if line_start == 0 {
            return true;
        }
        let prev_start = text[..line_start - 1].rfind('\n').map_or(0, |i| i + 1);
        !self.bare_label.is_match(&text[prev_start..line_start - 1])
    }
}

/// Label, optional `:`/`=`, optional "Stufe"/"Level", then 1-4 digits. The
/// value may sit on the next line; group 1 records that line break.
fn research_patterns(labels: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    labels
        .iter()
        .map(|label| {
            Regex::new(&format!(
                r"(?i)\b(?:{label})\b[ \t]*[:=]?[ \t]*(\n[ \t]*)?(?:(?:stufe|level|lvl)\.?[ \t]*)?([0-9]{{1,4}})\b"
            ))
        })
        .collect()
}

/// Decompose `g:s:p` into integers; `None` unless all three parse.
pub fn split_coords(raw: &str) -> Option<CoordTriple> {
    let mut parts = raw.split(':').map(|p| p.trim().parse::<u32>());
    let galaxy = parts.next()?.ok()?;
    let system = parts.next()?.ok()?;
    let position = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(CoordTriple {
        galaxy,
        system,
        position,
    })
}
