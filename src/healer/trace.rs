use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::store::SelectorType;

/// Stages of the resolution cascade, in the order they run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    TryStore,
    TryOriginal,
    TryHeuristic,
    TryPredicted,
    Resolved,
    Failed,
}

/// Outcome of one stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StageResult {
    Resolved,
    Skipped { reason: String },
    Failed,
}

/// Outcome of one candidate attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AttemptResult {
    Visible,
    Timeout { timeout_ms: u64 },
    Rejected { reason: String },
    WrongKind { actual: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub selector_type: SelectorType,
    pub selector: String,
    pub score: Option<f64>,
    pub result: AttemptResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: Stage,
    pub result: StageResult,
    pub attempts: Vec<AttemptRecord>,
    pub duration_ms: u64,
}

/// Structured record of one `resolve` call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTrace {
    pub locator_id: String,
    pub stages: Vec<StageRecord>,
    pub final_stage: Option<Stage>,
}

impl ResolveTrace {
    pub fn new(locator_id: &str) -> Self {
        Self {
            locator_id: locator_id.to_string(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, record: StageRecord) {
        self.stages.push(record);
    }

    pub fn finish(&mut self, stage: Stage) {
        self.final_stage = Some(stage);
    }

    /// Candidates tried across all stages
    pub fn attempt_count(&self) -> usize {
        self.stages.iter().map(|s| s.attempts.len()).sum()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn is_resolved(&self) -> bool {
        self.final_stage == Some(Stage::Resolved)
    }
}

/// Collects attempts while a stage runs
pub(crate) struct StageRecorder {
    stage: Stage,
    attempts: Vec<AttemptRecord>,
    started_at: Instant,
}

impl StageRecorder {
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            attempts: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn attempt(
        &mut self,
        selector_type: &SelectorType,
        selector: &str,
        score: Option<f64>,
        result: AttemptResult,
    ) {
        self.attempts.push(AttemptRecord {
            selector_type: selector_type.clone(),
            selector: selector.to_string(),
            score,
            result,
        });
    }

    pub fn finish(self, result: StageResult) -> StageRecord {
        StageRecord {
            stage: self.stage,
            result,
            attempts: self.attempts,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}
