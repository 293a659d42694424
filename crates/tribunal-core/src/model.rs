use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// One fully-specified benchmark unit. Identity is structural: the same
/// (model, region, temperature, prompt) tuple is a distinct scenario even when
/// derived from the same base. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub prompt: String,
    pub task_type: String,
    pub task_criteria: String,
    pub golden_answer: String,
    pub model_id: String,
    pub region: String,
    pub expected_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// Image URL forwarded to the transport when vision is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_payload: Option<String>,
    /// Per-1K-token rates used for response cost.
    pub input_token_cost: f64,
    pub output_token_cost: f64,
}

impl Scenario {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_tokens: self.expected_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// One member of the jury. Loaded once per run and shared read-only across all
/// concurrent evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeProfile {
    pub model_id: String,
    pub region: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Judgment {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "ERROR")]
    Error,
}

/// One judge's view of one candidate response. `scores: None` is the explicit
/// no-score marker for judges whose call or parse failed; `cost` is populated
/// only when scoring succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub judge_id: String,
    pub judgment: Judgment,
    pub scores: Option<BTreeMap<String, f64>>,
    pub explanation: String,
    pub raw_response: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
}

/// The reduced panel verdict. `majority_judgment` is never `Error`: ERROR
/// verdicts are excluded from the vote, and an all-ERROR panel falls through
/// to Fail because neither count exceeds the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub majority_judgment: Judgment,
    pub majority_explanations: Vec<String>,
    /// Per-metric mean over judges that returned that metric.
    pub majority_scores: BTreeMap<String, f64>,
    pub eval_cost: f64,
    pub verdicts: Vec<JudgeVerdict>,
}

impl ConsensusResult {
    pub fn passed(&self) -> bool {
        self.majority_judgment == Judgment::Pass
    }
}

/// "Success" or the transport's error description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failed(String),
}

impl CallStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CallStatus::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Success => "Success",
            CallStatus::Failed(msg) => msg,
        }
    }
}

impl Serialize for CallStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CallStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(if s == "Success" {
            CallStatus::Success
        } else {
            CallStatus::Failed(s)
        })
    }
}

/// One row per (scenario, invocation, experiment run). Terminal once written
/// to the aggregate file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub api_call_status: CallStatus,
    pub time_to_first_byte: Option<f64>,
    pub time_to_last_byte: Option<f64>,
    pub total_runtime: Option<f64>,
    pub throughput_tps: Option<f64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub response_cost: Option<f64>,
    pub model_response: String,
    pub judge_success: Option<bool>,
    pub judge_explanation: String,
    pub judge_scores: BTreeMap<String, f64>,
    /// Full per-judge details, ERROR verdicts included.
    pub judge_details: Vec<JudgeVerdict>,
    pub evaluation_cost: f64,
    /// Opaque counter supplied by the transport; recorded, never recomputed.
    pub retry_count: u32,
    pub run_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkRecord {
    /// A degenerate record for an invocation that never produced a response.
    pub fn failed(scenario: &Scenario, status: impl Into<String>) -> Self {
        Self {
            scenario: scenario.clone(),
            api_call_status: CallStatus::Failed(status.into()),
            time_to_first_byte: None,
            time_to_last_byte: None,
            total_runtime: None,
            throughput_tps: None,
            input_tokens: None,
            output_tokens: None,
            response_cost: None,
            model_response: String::new(),
            judge_success: None,
            judge_explanation: String::new(),
            judge_scores: BTreeMap::new(),
            judge_details: Vec::new(),
            evaluation_cost: 0.0,
            retry_count: 0,
            run_count: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn apply_consensus(&mut self, consensus: ConsensusResult) {
        self.judge_success = Some(consensus.passed());
        let mut seen = Vec::new();
        for e in &consensus.majority_explanations {
            if !e.is_empty() && !seen.contains(e) {
                seen.push(e.clone());
            }
        }
        self.judge_explanation = seen.join(";");
        self.judge_scores = consensus.majority_scores;
        self.evaluation_cost = consensus.eval_cost;
        self.judge_details = consensus.verdicts;
    }
}

/// A scenario execution that did not complete successfully, quarantined for
/// later inspection instead of being dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnprocessedRecord {
    pub scenario: Scenario,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BenchmarkRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl UnprocessedRecord {
    pub fn from_result(record: BenchmarkRecord, reason: impl Into<String>) -> Self {
        Self {
            scenario: record.scenario.clone(),
            result: Some(record),
            exception: None,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_exception(scenario: &Scenario, exception: impl Into<String>) -> Self {
        Self {
            scenario: scenario.clone(),
            result: None,
            exception: Some(exception.into()),
            reason: "Exception during processing".into(),
            timestamp: Utc::now(),
        }
    }
}
