// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spyglass: spy report acquisition and normalization.
//!
//! Fetches a spy report page through an ordered chain of request strategies,
//! extracts the target's identity and research levels with tolerant patterns,
//! and scores the result into a threat band. [`Pipeline`] ties the stages
//! together and always returns a [`PipelineResult`].

pub mod acquisition;
pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod threat;
pub mod types;

pub use acquisition::{default_strategies, FetchOutcome, Fetcher, Strategy, Transport};
pub use config::{FetcherConfig, RelayPolicy, SpyglassConfig, TargetPolicy};
pub use error::{ConfigError, EvalError, FetchError, ParseError};
pub use extraction::parse;
pub use pipeline::Pipeline;
pub use progress::{ProgressEvent, ProgressEventKind};
pub use store::{ReportSink, StoreContext, StoreError};
pub use threat::{evaluate, rank, ThreatModel};
pub use types::*;
