use crate::judge::{EvaluationRequest, JudgeService};
use crate::model::{BenchmarkRecord, CallStatus, Scenario};
use crate::providers::{InferenceClient, InferenceRequest};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status recorded when the transport returned an empty response and the jury
/// was therefore never convened.
pub const EMPTY_RESPONSE_STATUS: &str = "LLM-AS-A-JURY EVALUATION ERROR";

/// Executes exactly one (scenario, invocation) pair end-to-end: transport
/// call, timing/cost attachment, jury evaluation. Holds no mutable state, so
/// any number of worker tasks can share one instance.
pub struct Executor {
    pub client: Arc<dyn InferenceClient>,
    pub judge: JudgeService,
}

impl Executor {
    pub fn new(client: Arc<dyn InferenceClient>, judge: JudgeService) -> Self {
        Self { client, judge }
    }

    /// Always yields a record, degenerate on transport failure. `Err` is
    /// reserved for unexpected internal failures; the orchestrator captures
    /// those at the task boundary.
    pub async fn run_invocation(&self, scenario: &Scenario) -> anyhow::Result<BenchmarkRecord> {
        tracing::debug!(
            model = %scenario.model_id,
            region = %scenario.region,
            temperature = scenario.temperature,
            "starting benchmark invocation"
        );

        let reply = match self
            .client
            .invoke(InferenceRequest {
                model_id: &scenario.model_id,
                region: &scenario.region,
                prompt: &scenario.prompt,
                config: scenario.generation_config(),
                input_cost_per_1k: scenario.input_token_cost,
                output_cost_per_1k: scenario.output_token_cost,
                vision_payload: scenario.vision_payload.as_deref(),
            })
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(model = %scenario.model_id, "transport error: {e:#}");
                return Ok(BenchmarkRecord::failed(scenario, format!("{e:#}")));
            }
        };

        let mut record = BenchmarkRecord {
            scenario: scenario.clone(),
            api_call_status: CallStatus::Success,
            time_to_first_byte: reply.time_to_first_byte,
            time_to_last_byte: reply.time_to_last_byte,
            total_runtime: Some(reply.total_runtime),
            throughput_tps: reply.throughput_tps,
            input_tokens: Some(reply.input_tokens),
            output_tokens: Some(reply.output_tokens),
            response_cost: Some(reply.total_cost),
            model_response: reply.text,
            judge_success: None,
            judge_explanation: String::new(),
            judge_scores: BTreeMap::new(),
            judge_details: Vec::new(),
            evaluation_cost: 0.0,
            retry_count: reply.retry_count,
            run_count: 0,
            timestamp: Utc::now(),
        };

        if record.model_response.is_empty() {
            tracing::error!(model = %scenario.model_id, "empty response, skipping jury");
            record.api_call_status = CallStatus::Failed(EMPTY_RESPONSE_STATUS.into());
            return Ok(record);
        }

        let consensus = self
            .judge
            .evaluate(EvaluationRequest {
                prompt: &scenario.prompt,
                model_response: &record.model_response,
                golden_answer: &scenario.golden_answer,
                task_type: &scenario.task_type,
                task_criteria: &scenario.task_criteria,
            })
            .await;
        record.apply_consensus(consensus);

        Ok(record)
    }
}
