// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spyglass CLI: configuration resolution and output rendering.

pub mod config;
pub mod output;

pub use config::{load_config, missing_hosts_hint, resolve_config_path};
pub use output::{render_human, render_json};
