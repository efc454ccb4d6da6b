// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end pipeline tests over a scripted transport.
//!
//! Covers strategy fallback, target validation, partial results on parse and
//! evaluation failure, persistence hand-off and threat ranking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use spyglass::acquisition::{
    Fetcher, Strategy, Transport, TransportError, TransportRequest, TransportResponse,
};
use spyglass::error::MANUAL_PASTE_HINT;
use spyglass::threat::ResearchWeights;
use spyglass::*;

// ─────────────────────── helpers ───────────────────────

const URL: &str = "https://game.example/spy/report?id=7";

/// How the scripted transport answers one strategy, keyed by its marker header.
#[derive(Clone, Copy)]
enum Reply {
    Stall,
    Status(u16),
    Report,
    Garbage,
}

/// Transport that answers according to the `X-Script` header of each request.
struct ScriptedTransport {
    script: Vec<(&'static str, Reply)>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<(&'static str, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            script,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let marker = request
            .headers
            .iter()
            .find(|(k, _)| k == "X-Script")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        self.seen.lock().unwrap().push(marker.clone());

        let reply = self
            .script
            .iter()
            .find(|(name, _)| *name == marker)
            .map(|(_, reply)| *reply)
            .unwrap_or(Reply::Status(404));

        let body = match reply {
            Reply::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return Err(TransportError::Timeout);
            }
            Reply::Status(status) => {
                return Ok(TransportResponse {
                    status,
                    location: None,
                    body: String::new(),
                })
            }
            Reply::Report => report_page(),
            Reply::Garbage => format!("<html><body>{}</body></html>", "lorem ipsum ".repeat(20)),
        };
        Ok(TransportResponse {
            status: 200,
            location: None,
            body,
        })
    }
}

fn report_page() -> String {
    format!(
        "<html><head><title>Spionagebericht</title></head><body>\
         <div>Spieler: Nova</div><div>TEMPEL (555:849:4)</div>\
         <div>Spionageeinheit: 120</div><div>Tarn: 80</div>\
         <footer>{}</footer></body></html>",
        "&nbsp;".repeat(100)
    )
}

fn scripted(name: &'static str) -> Strategy {
    Strategy::direct(name).with_header("X-Script", name)
}

fn pipeline(transport: Arc<ScriptedTransport>, strategies: Vec<Strategy>) -> Pipeline {
    let config = FetcherConfig {
        max_attempts: 1,
        timeout_ms: 30,
        base_delay_ms: 0,
        max_delay_ms: 0,
        min_body_bytes: 128,
        ..FetcherConfig::default()
    };
    let fetcher = Fetcher::new(
        transport,
        TargetPolicy::for_host("game.example"),
        config,
        strategies,
    );
    Pipeline::new(fetcher, ThreatModel::default())
}

// ─────────────────────── fetching ───────────────────────

#[tokio::test]
async fn test_two_timeouts_then_success() {
    let transport = ScriptedTransport::new(vec![
        ("first", Reply::Stall),
        ("second", Reply::Stall),
        ("third", Reply::Report),
    ]);
    let p = pipeline(
        transport.clone(),
        vec![scripted("first"), scripted("second"), scripted("third")],
    );

    let result = p.submit_by_url(URL).await;
    assert!(result.success());
    assert_eq!(result.state(), PipelineState::Done(DoneState::Success));
    assert_eq!(result.failed_attempts(), 2);
    assert_eq!(result.attempts().len(), 3);
    assert!(result.attempts()[2].is_success());
    assert_eq!(result.raw().strategy(), Some("third"));
    assert_eq!(result.raw().source_url(), Some(URL));
    assert_eq!(transport.calls(), ["first", "second", "third"]);

    let parsed = result.parsed().unwrap();
    assert_eq!(parsed.target_player(), Some("Nova"));
    assert_eq!(result.evaluation().unwrap().label, "Medium");
}

#[tokio::test]
async fn test_off_domain_url_makes_no_calls() {
    let transport = ScriptedTransport::new(vec![("direct", Reply::Report)]);
    let p = pipeline(transport.clone(), vec![scripted("direct")]);

    let result = p.submit_by_url("https://phish.example/spy/report?id=7").await;
    assert_eq!(result.state(), PipelineState::Done(DoneState::FetchFailed));
    assert_eq!(result.error().unwrap().kind, "InvalidTarget");
    assert!(result.attempts().is_empty());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_exhausted_strategies_suggest_paste() {
    let transport = ScriptedTransport::new(vec![("a", Reply::Status(503)), ("b", Reply::Status(403))]);
    let p = pipeline(transport, vec![scripted("a"), scripted("b")]);

    let result = p.submit_by_url(URL).await;
    assert!(!result.success());
    let error = result.error().unwrap();
    assert_eq!(error.stage, ErrorStage::Fetch);
    assert!(error.message.contains("status 403"));
    assert_eq!(error.suggestion.as_deref(), Some(MANUAL_PASTE_HINT));
    assert_eq!(result.failed_attempts(), 2);
}

// ─────────────────────── partial results ───────────────────────

#[tokio::test]
async fn test_fetched_page_without_identity_keeps_markup() {
    let transport = ScriptedTransport::new(vec![("direct", Reply::Garbage)]);
    let p = pipeline(transport, vec![scripted("direct")]);

    let result = p.submit_by_url(URL).await;
    assert_eq!(result.state(), PipelineState::Done(DoneState::ParseFailed));
    assert!(result.raw().markup().contains("lorem ipsum"));
    assert_eq!(result.raw().strategy(), Some("direct"));
    assert!(result.parsed().is_none());
    assert_eq!(result.error().unwrap().stage, ErrorStage::Parse);
}

#[tokio::test]
async fn test_invalid_model_keeps_parsed_report() {
    let transport = ScriptedTransport::new(vec![("direct", Reply::Report)]);
    let fetcher = Fetcher::new(
        transport,
        TargetPolicy::for_host("game.example"),
        FetcherConfig {
            max_attempts: 1,
            ..FetcherConfig::default()
        },
        vec![scripted("direct")],
    );
    let model = ThreatModel {
        weights: ResearchWeights {
            spionage: 0.0,
            tarn: 0.0,
            invasion: 0.0,
            pluender: 0.0,
            sabotage: 0.0,
        },
        ..ThreatModel::default()
    };
    let result = Pipeline::new(fetcher, model).submit_by_url(URL).await;

    assert_eq!(result.state(), PipelineState::Done(DoneState::EvalFailed));
    assert_eq!(result.parsed().unwrap().planet_name(), Some("TEMPEL"));
    assert_eq!(result.error().unwrap().kind, "InvalidModel");
}

#[tokio::test]
async fn test_result_json_omits_attempt_log() {
    let transport = ScriptedTransport::new(vec![("direct", Reply::Report)]);
    let p = pipeline(transport, vec![scripted("direct")]);
    let result = p.submit_by_url(URL).await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["state"]["state"], "done");
    assert_eq!(json["state"]["outcome"], "success");
    assert_eq!(json["parsed"]["coords"]["galaxy"], 555);
    assert_eq!(json["evaluation"]["percentage"], 28);
    assert!(json.get("attempts").is_none());
    assert!(json.get("error").is_none());
}

// ─────────────────────── persistence & ranking ───────────────────────

/// Sink that keeps every stored submission in memory.
#[derive(Default)]
struct MemorySink {
    stored: Mutex<Vec<(uuid::Uuid, StoreContext)>>,
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn store(
        &self,
        result: &PipelineResult,
        context: &StoreContext,
    ) -> Result<String, StoreError> {
        if result.parsed().is_none() {
            return Err(StoreError::Rejected("nothing to file".to_string()));
        }
        let mut stored = self.stored.lock().unwrap();
        stored.push((result.submission_id(), context.clone()));
        Ok(format!("report-{}", stored.len()))
    }
}

#[tokio::test]
async fn test_sink_receives_finished_result_once() {
    let transport = ScriptedTransport::new(vec![("direct", Reply::Report)]);
    let p = pipeline(transport, vec![scripted("direct")]);
    let sink = MemorySink::default();
    let context = StoreContext {
        reporter_id: "u-17".to_string(),
        alliance_id: "a-3".to_string(),
        branch: "main".to_string(),
    };

    let result = p.submit_by_url(URL).await;
    let id = sink.store(&result, &context).await.unwrap();
    assert_eq!(id, "report-1");

    let stored = sink.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, result.submission_id());
    assert_eq!(stored[0].1, context);
}

#[tokio::test]
async fn test_sink_may_reject_unparsed_results() {
    let transport = ScriptedTransport::new(vec![]);
    let p = pipeline(transport, vec![scripted("direct")]);
    let sink = MemorySink::default();
    let context = StoreContext {
        reporter_id: "u-1".to_string(),
        alliance_id: "a-1".to_string(),
        branch: "main".to_string(),
    };

    let result = p.submit_by_markup("   ", None).await;
    assert!(matches!(
        sink.store(&result, &context).await,
        Err(StoreError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_submissions_rank_by_threat() {
    let p = pipeline(ScriptedTransport::new(vec![]), vec![]);
    let reports = [
        "Spieler: Low\nTarn: 20",
        "Spieler: Top\nSpionage: 190\nTarn: 190\nInvasion: 190\nPlünderung: 190",
        "Spieler: Mid\nSpionage: 120\nTarn: 80",
    ];

    let mut results = Vec::new();
    for markup in reports {
        results.push(p.submit_by_markup(markup, None).await);
    }
    rank(&mut results);

    let order: Vec<_> = results
        .iter()
        .filter_map(|r| r.parsed()?.target_player())
        .collect();
    assert_eq!(order, ["Top", "Mid", "Low"]);
    let labels: Vec<_> = results
        .iter()
        .map(|r| r.evaluation().unwrap().label.as_str())
        .collect();
    assert_eq!(labels, ["Critical", "Medium", "Low"]);
}
