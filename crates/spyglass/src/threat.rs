// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Threat evaluator.
//!
//! # Scoring
//!
//! Each research level is clipped to `level_cap` and scaled to `[0, 1]`. The
//! score is the weighted mean of the five scaled levels, times 100, rounded.
//! Missing levels count as zero. Every term is non-decreasing in its level and
//! the weights are non-negative, so raising any single level never lowers the
//! score. Default weights favour the levels that make a target hard to spy on
//! and hard to attack:
//!
//! | field    | weight |
//! |----------|--------|
//! | spionage | 0.30   |
//! | tarn     | 0.25   |
//! | invasion | 0.20   |
//! | pluender | 0.15   |
//! | sabotage | 0.10   |
//!
//! The score then falls into the last band whose lower bound it reaches:
//! Low (0, green), Medium (25, yellow), High (50, orange), Critical (75, red).

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::types::{ParsedReport, PipelineResult, Research, ThreatEvaluation};

/// Relative weight of each research field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchWeights {
    pub spionage: f64,
    pub tarn: f64,
    pub invasion: f64,
    pub pluender: f64,
    pub sabotage: f64,
}

impl Default for ResearchWeights {
    fn default() -> Self {
        Self {
            spionage: 0.30,
            tarn: 0.25,
            invasion: 0.20,
            pluender: 0.15,
            sabotage: 0.10,
        }
    }
}

impl ResearchWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.spionage,
            self.tarn,
            self.invasion,
            self.pluender,
            self.sabotage,
        ]
    }
}

/// A labelled score range starting at `min_percentage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatBand {
    pub min_percentage: u8,
    pub label: String,
    pub color_token: String,
}

impl ThreatBand {
    pub fn new(min_percentage: u8, label: &str, color_token: &str) -> Self {
        Self {
            min_percentage,
            label: label.to_string(),
            color_token: color_token.to_string(),
        }
    }
}

/// Weights, saturation cap and bands used to score reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatModel {
    pub weights: ResearchWeights,
    /// Levels at or above this count as maximal.
    pub level_cap: u32,
    /// Ascending by `min_percentage`; the first starts at 0.
    pub bands: Vec<ThreatBand>,
}

impl Default for ThreatModel {
    fn default() -> Self {
        Self {
            weights: ResearchWeights::default(),
            level_cap: 200,
            bands: vec![
                ThreatBand::new(0, "Low", "green"),
                ThreatBand::new(25, "Medium", "yellow"),
                ThreatBand::new(50, "High", "orange"),
                ThreatBand::new(75, "Critical", "red"),
            ],
        }
    }
}

impl ThreatModel {
    pub fn validate(&self) -> Result<(), EvalError> {
        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EvalError::InvalidModel(
                "weights must be finite and non-negative".into(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(EvalError::InvalidModel("weights must not all be zero".into()));
        }
        if self.level_cap == 0 {
            return Err(EvalError::InvalidModel("level_cap must be positive".into()));
        }
        match self.bands.first() {
            None => return Err(EvalError::InvalidModel("at least one band is required".into())),
            Some(first) if first.min_percentage != 0 => {
                return Err(EvalError::InvalidModel("the first band must start at 0".into()))
            }
            Some(_) => {}
        }
        if self
            .bands
            .windows(2)
            .any(|pair| pair[0].min_percentage >= pair[1].min_percentage)
        {
            return Err(EvalError::InvalidModel(
                "band bounds must be strictly ascending".into(),
            ));
        }
        if self.bands.iter().any(|b| b.min_percentage > 100) {
            return Err(EvalError::InvalidModel("band bounds must be at most 100".into()));
        }
        Ok(())
    }

    /// Score in `[0, 100]` for a set of research levels.
    pub fn score(&self, research: &Research) -> u8 {
        let cap = f64::from(self.level_cap.max(1));
        let levels = [
            research.spionage,
            research.tarn,
            research.invasion,
            research.pluender,
            research.sabotage,
        ];
        let weights = self.weights.as_array();
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return 0;
        }

        let weighted: f64 = levels
            .iter()
            .zip(weights.iter())
            .map(|(level, weight)| {
                let level = f64::from(level.unwrap_or(0).min(self.level_cap));
                weight * level / cap
            })
            .sum();

        let percentage = (weighted / total_weight * 100.0).round();
        percentage.clamp(0.0, 100.0) as u8
    }

    /// Classify a parsed report.
    pub fn evaluate(&self, parsed: &ParsedReport) -> Result<ThreatEvaluation, EvalError> {
        self.validate()?;
        let percentage = self.score(parsed.research());
        let band = self
            .bands
            .iter()
            .rev()
            .find(|b| b.min_percentage <= percentage)
            .ok_or_else(|| EvalError::InvalidModel("no band covers the score".into()))?;

        Ok(ThreatEvaluation {
            label: band.label.clone(),
            color_token: band.color_token.clone(),
            percentage,
        })
    }
}

/// Classify a parsed report with the default model.
pub fn evaluate(parsed: &ParsedReport) -> Result<ThreatEvaluation, EvalError> {
    ThreatModel::default().evaluate(parsed)
}

/// Order results by threat, highest first. Unevaluated results go last;
/// equal scores keep their input order.
pub fn rank(results: &mut [PipelineResult]) {
    results.sort_by(|a, b| {
        let key = |r: &PipelineResult| r.evaluation().map(|e| e.percentage);
        key(b).cmp(&key(a))
    });
}
