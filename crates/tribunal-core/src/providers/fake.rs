use super::{InferenceClient, InferenceReply, InferenceRequest, JudgeClient, JudgeReply};
use crate::model::GenerationConfig;
use async_trait::async_trait;
use std::sync::Mutex;

/// Deterministic transport for tests and dry runs. Echoes a fixed response
/// with stable token counts; optionally fails for selected model ids so
/// partial-failure paths can be exercised.
#[derive(Debug, Default)]
pub struct FakeInferenceClient {
    fixed_response: Option<String>,
    fail_for_models: Vec<String>,
    panic_for_models: Vec<String>,
}

impl FakeInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: String) -> Self {
        self.fixed_response = Some(response);
        self
    }

    pub fn failing_for(mut self, model_id: impl Into<String>) -> Self {
        self.fail_for_models.push(model_id.into());
        self
    }

    /// Panic instead of erroring for the given model, to exercise task-level
    /// crash handling in the pool.
    pub fn panicking_for(mut self, model_id: impl Into<String>) -> Self {
        self.panic_for_models.push(model_id.into());
        self
    }
}

#[async_trait]
impl InferenceClient for FakeInferenceClient {
    async fn invoke(&self, req: InferenceRequest<'_>) -> anyhow::Result<InferenceReply> {
        if self.panic_for_models.iter().any(|m| m == req.model_id) {
            panic!("scripted panic for {}", req.model_id);
        }
        if self.fail_for_models.iter().any(|m| m == req.model_id) {
            anyhow::bail!("scripted transport error for {}", req.model_id);
        }
        let text = self
            .fixed_response
            .clone()
            .unwrap_or_else(|| format!("fake response to: {}", req.prompt));
        let input_tokens = req.prompt.split_whitespace().count() as u64;
        let output_tokens = text.split_whitespace().count() as u64;
        Ok(InferenceReply {
            text,
            input_tokens,
            output_tokens,
            total_runtime: 0.01,
            time_to_first_byte: Some(0.005),
            time_to_last_byte: Some(0.01),
            throughput_tps: Some(output_tokens as f64 / 0.01),
            total_cost: input_tokens as f64 * (req.input_cost_per_1k / 1000.0)
                + output_tokens as f64 * (req.output_cost_per_1k / 1000.0),
            retry_count: 0,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Scripted judge: pops one reply per call, in order. An exhausted script is
/// an error so tests notice extra calls.
#[derive(Debug, Default)]
pub struct FakeJudgeClient {
    responses: Mutex<Vec<String>>,
}

impl FakeJudgeClient {
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    /// A judge that always returns the given per-metric score for the
    /// standard metric set.
    pub fn uniform_score(score: u32) -> Self {
        let scores: Vec<String> = crate::judge::STANDARD_METRICS
            .iter()
            .map(|m| format!("\"{}\": {}", m, score))
            .collect();
        let text = format!("{{\"scores\": {{{}}}}}", scores.join(", "));
        Self::scripted(vec![text; 16])
    }
}

#[async_trait]
impl JudgeClient for FakeJudgeClient {
    async fn grade(
        &self,
        _model_id: &str,
        _region: &str,
        _instruction: &str,
        _config: &GenerationConfig,
    ) -> anyhow::Result<JudgeReply> {
        let mut scripts = self.responses.lock().unwrap();
        if scripts.is_empty() {
            anyhow::bail!("no more scripted judge responses");
        }
        let text = scripts.remove(0);
        Ok(JudgeReply {
            input_tokens: 100,
            output_tokens: text.split_whitespace().count() as u64,
            text,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
