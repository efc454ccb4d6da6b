// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence seam.
//!
//! The pipeline never stores anything itself. Callers hand a finished
//! [`PipelineResult`] to a [`ReportSink`] together with who reported it.
//! Results are always in a `Done` state, so any of them may be stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PipelineResult;

/// Who submitted a report and where it should be filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContext {
    pub reporter_id: String,
    pub alliance_id: String,
    /// Alliance branch (sub-group) the report belongs to.
    pub branch: String,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Storage rejected the result: {0}")]
    Rejected(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Destination for finished pipeline results.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist `result` and return the stored record's id.
    async fn store(
        &self,
        result: &PipelineResult,
        context: &StoreContext,
    ) -> Result<String, StoreError>;
}
