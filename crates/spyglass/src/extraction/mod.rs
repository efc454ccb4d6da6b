// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Report parsing: markup flattening, tolerant field patterns, and the parser
//! that combines them.

pub mod parser;
pub mod patterns;
pub mod text;

pub use parser::parse;
pub use patterns::{split_coords, Patterns};
pub use text::{html_to_text, normalize_whitespace};
