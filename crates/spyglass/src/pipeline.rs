// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline orchestrator: fetch, parse, evaluate.
//!
//! Every submission runs once through the state machine documented on
//! [`PipelineState`] and ends in exactly one [`PipelineResult`]. Failures at
//! any stage end the run with whatever was already obtained: the raw markup is
//! kept after a parse failure, the parsed record after an evaluation failure.
//! Nothing is retried past the fetch stage; parsing and evaluation are pure.

use std::future::Future;

use tracing::{info, warn};
use uuid::Uuid;

use crate::acquisition::fetcher::{FetchOutcome, Fetcher};
use crate::acquisition::transport::TransportError;
use crate::config::SpyglassConfig;
use crate::extraction::parser::parse;
use crate::progress::{ProgressReceiver, ProgressReporter, ProgressSender};
use crate::threat::ThreatModel;
use crate::types::{
    DoneState, ErrorInfo, ErrorStage, FetchAttempt, PipelineResult, PipelineState, RawReport,
};

/// Entry point for spy report submissions.
///
/// Holds only read-only configuration, so one instance can serve any number
/// of concurrent submissions.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Fetcher,
    model: ThreatModel,
    progress: Option<ProgressSender>,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, model: ThreatModel) -> Self {
        Self {
            fetcher,
            model,
            progress: None,
        }
    }

    /// Pipeline over the production transport.
    pub fn from_config(config: &SpyglassConfig) -> Result<Self, TransportError> {
        Ok(Self::new(Fetcher::from_config(config)?, config.threat.clone()))
    }

    /// Emit progress events on `tx`.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    /// New receiver for progress events, if a channel is attached.
    pub fn subscribe(&self) -> Option<ProgressReceiver> {
        self.progress.as_ref().map(|tx| tx.subscribe())
    }

    /// Fetch, parse and evaluate the report at `url`.
    ///
    /// Dropping the returned future cancels the in-flight request.
    pub async fn submit_by_url(&self, url: &str) -> PipelineResult {
        self.submit_by_url_with_cancel(url, std::future::pending::<()>())
            .await
    }

    /// Like [`Pipeline::submit_by_url`], but stops fetching as soon as
    /// `cancel` completes and returns a `Done(Cancelled)` result.
    pub async fn submit_by_url_with_cancel<C>(&self, url: &str, cancel: C) -> PipelineResult
    where
        C: Future<Output = ()>,
    {
        let id = Uuid::new_v4();
        let mut progress = ProgressReporter::new(self.progress.clone(), id.to_string());
        progress.state(PipelineState::Idle);
        progress.state(PipelineState::Fetching);
        info!(submission = %id, url, "submission started");

        let outcome = {
            let fetch = self.fetcher.fetch_logged(url, &mut progress);
            tokio::select! {
                outcome = fetch => Some(outcome),
                _ = cancel => None,
            }
        };

        let Some(FetchOutcome { result, attempts }) = outcome else {
            warn!(submission = %id, "submission cancelled while fetching");
            progress.state(PipelineState::Done(DoneState::Cancelled));
            let error = ErrorInfo {
                stage: ErrorStage::Cancelled,
                kind: "Cancelled".to_string(),
                message: "The submission was cancelled before the report was fetched".to_string(),
                suggestion: None,
            };
            return PipelineResult::failed(
                id,
                DoneState::Cancelled,
                RawReport::unfetched(url),
                None,
                error,
                Vec::new(),
            );
        };

        match result {
            Ok(raw) => self.process(id, raw, attempts, &mut progress),
            Err(e) => {
                warn!(submission = %id, error = %e, attempts = attempts.len(), "fetch failed");
                progress.state(PipelineState::Done(DoneState::FetchFailed));
                PipelineResult::failed(
                    id,
                    DoneState::FetchFailed,
                    RawReport::unfetched(url),
                    None,
                    ErrorInfo::from(&e),
                    attempts,
                )
            }
        }
    }

    /// Parse and evaluate markup supplied by the user. No network access.
    pub async fn submit_by_markup(
        &self,
        markup: impl Into<String>,
        source_url: Option<String>,
    ) -> PipelineResult {
        let id = Uuid::new_v4();
        let mut progress = ProgressReporter::new(self.progress.clone(), id.to_string());
        progress.state(PipelineState::PastedMarkup);
        info!(submission = %id, "pasted submission started");

        let raw = RawReport::pasted(markup, source_url);
        self.process(id, raw, Vec::new(), &mut progress)
    }

    /// Parsing -> Evaluating -> Done.
    fn process(
        &self,
        id: Uuid,
        raw: RawReport,
        attempts: Vec<FetchAttempt>,
        progress: &mut ProgressReporter,
    ) -> PipelineResult {
        progress.state(PipelineState::Parsing);
        let parsed = match parse(raw.markup()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(submission = %id, error = %e, "parse failed");
                progress.state(PipelineState::Done(DoneState::ParseFailed));
                return PipelineResult::failed(
                    id,
                    DoneState::ParseFailed,
                    raw,
                    None,
                    ErrorInfo::from(&e),
                    attempts,
                );
            }
        };

        progress.state(PipelineState::Evaluating);
        match self.model.evaluate(&parsed) {
            Ok(evaluation) => {
                info!(
                    submission = %id,
                    threat = %evaluation.label,
                    percentage = evaluation.percentage,
                    "submission complete"
                );
                progress.state(PipelineState::Done(DoneState::Success));
                PipelineResult::succeeded(id, raw, parsed, evaluation, attempts)
            }
            Err(e) => {
                warn!(submission = %id, error = %e, "evaluation failed");
                progress.state(PipelineState::Done(DoneState::EvalFailed));
                PipelineResult::failed(
                    id,
                    DoneState::EvalFailed,
                    raw,
                    Some(parsed),
                    ErrorInfo::from(&e),
                    attempts,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::strategy::Strategy;
    use crate::acquisition::transport::{Transport, TransportRequest, TransportResponse};
    use crate::config::{FetcherConfig, TargetPolicy};
    use crate::progress::{self, ProgressEventKind};
    use crate::threat::{self, ResearchWeights};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    const REPORT: &str = "<html><body><div>Spieler: Nova</div><div>TEMPEL (555:849:4)</div>\
                          <div>Spionageeinheit: 120</div><div>Tarn: 80</div></body></html>";

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn get(&self, _: &TransportRequest) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Network("unreachable".to_string()))
        }
    }

    struct Stalling;

    #[async_trait]
    impl Transport for Stalling {
        async fn get(&self, _: &TransportRequest) -> Result<TransportResponse, TransportError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(TransportError::Timeout)
        }
    }

    fn pipeline(transport: Arc<dyn Transport>, model: ThreatModel) -> Pipeline {
        let config = FetcherConfig {
            max_attempts: 1,
            base_delay_ms: 0,
            ..FetcherConfig::default()
        };
        let fetcher = Fetcher::new(
            transport,
            TargetPolicy::for_host("game.example"),
            config,
            vec![Strategy::direct("direct")],
        );
        Pipeline::new(fetcher, model)
    }

    #[tokio::test]
    async fn test_markup_submission_succeeds() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        let result = p.submit_by_markup(REPORT, None).await;
        assert!(result.success());
        assert_eq!(result.state(), PipelineState::Done(DoneState::Success));
        assert_eq!(result.parsed().unwrap().target_player(), Some("Nova"));
        assert_eq!(result.evaluation().unwrap().percentage, 28);
        assert!(result.attempts().is_empty());
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_raw_markup() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        let markup = "<p>Spionageeinheit: 120</p>";
        let result = p
            .submit_by_markup(markup, Some("https://game.example/spy/1".to_string()))
            .await;
        assert!(!result.success());
        assert_eq!(result.state(), PipelineState::Done(DoneState::ParseFailed));
        assert_eq!(result.raw().markup(), markup);
        assert_eq!(result.raw().source_url(), Some("https://game.example/spy/1"));
        assert_eq!(result.error().unwrap().kind, "NoIdentity");
        assert!(result.parsed().is_none());
    }

    #[tokio::test]
    async fn test_empty_paste_is_parse_failure() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        let result = p.submit_by_markup("", None).await;
        assert_eq!(result.state(), PipelineState::Done(DoneState::ParseFailed));
        assert_eq!(result.error().unwrap().kind, "EmptyInput");
    }

    #[tokio::test]
    async fn test_eval_failure_keeps_parsed_record() {
        let broken = ThreatModel {
            weights: ResearchWeights {
                spionage: f64::NAN,
                ..ResearchWeights::default()
            },
            ..ThreatModel::default()
        };
        let p = pipeline(Arc::new(Unreachable), broken);
        let result = p.submit_by_markup(REPORT, None).await;
        assert_eq!(result.state(), PipelineState::Done(DoneState::EvalFailed));
        assert!(result.parsed().is_some());
        assert!(result.evaluation().is_none());
        assert_eq!(result.error().unwrap().stage, ErrorStage::Evaluate);
    }

    #[tokio::test]
    async fn test_fetch_failure_suggests_manual_paste() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        let result = p.submit_by_url("https://game.example/spy/1").await;
        assert_eq!(result.state(), PipelineState::Done(DoneState::FetchFailed));
        let error = result.error().unwrap();
        assert_eq!(error.kind, "AllStrategiesFailed");
        assert!(error.message.contains("unreachable"));
        assert_eq!(error.suggestion.as_deref(), Some(crate::error::MANUAL_PASTE_HINT));
        assert_eq!(result.raw().markup(), "");
        assert_eq!(result.failed_attempts(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_fetching() {
        let p = pipeline(Arc::new(Stalling), ThreatModel::default());
        let result = p
            .submit_by_url_with_cancel(
                "https://game.example/spy/1",
                tokio::time::sleep(Duration::from_millis(20)),
            )
            .await;
        assert_eq!(result.state(), PipelineState::Done(DoneState::Cancelled));
        assert_eq!(result.error().unwrap().stage, ErrorStage::Cancelled);
    }

    #[tokio::test]
    async fn test_progress_reports_state_transitions() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        assert!(p.subscribe().is_none());
        let (tx, _) = progress::channel();
        let p = p.with_progress(tx);
        let mut rx = p.subscribe().unwrap();
        p.submit_by_markup(REPORT, None).await;

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEventKind::StateChanged { state } = event.event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            [
                PipelineState::PastedMarkup,
                PipelineState::Parsing,
                PipelineState::Evaluating,
                PipelineState::Done(DoneState::Success),
            ]
        );
    }

    #[tokio::test]
    async fn test_rank_orders_by_threat() {
        let p = pipeline(Arc::new(Unreachable), ThreatModel::default());
        let low = p.submit_by_markup("Spieler: A\nTarn: 10", None).await;
        let failed = p.submit_by_markup("nothing here", None).await;
        let high = p
            .submit_by_markup("Spieler: B\nSpionage: 200\nTarn: 200\nInvasion: 200", None)
            .await;

        let mut results = vec![low, failed, high];
        threat::rank(&mut results);
        let players: Vec<_> = results
            .iter()
            .map(|r| r.parsed().and_then(|p| p.target_player()))
            .collect();
        assert_eq!(players, [Some("B"), Some("A"), None]);
    }
}
