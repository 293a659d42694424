pub mod fake;
pub mod openai;

use crate::model::GenerationConfig;
use async_trait::async_trait;

/// Everything the executor needs to issue one target-model call.
#[derive(Debug, Clone)]
pub struct InferenceRequest<'a> {
    pub model_id: &'a str,
    pub region: &'a str,
    pub prompt: &'a str,
    pub config: GenerationConfig,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub vision_payload: Option<&'a str>,
}

/// Canonical transport reply. Provider-specific field shapes are normalized
/// into this struct at the transport boundary; the core never probes raw
/// provider payloads.
#[derive(Debug, Clone, Default)]
pub struct InferenceReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_runtime: f64,
    pub time_to_first_byte: Option<f64>,
    pub time_to_last_byte: Option<f64>,
    pub throughput_tps: Option<f64>,
    pub total_cost: f64,
    /// Attempts consumed by the transport's own retry loop; opaque to the core.
    pub retry_count: u32,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, req: InferenceRequest<'_>) -> anyhow::Result<InferenceReply>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct JudgeReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn grade(
        &self,
        model_id: &str,
        region: &str,
        instruction: &str,
        config: &GenerationConfig,
    ) -> anyhow::Result<JudgeReply>;
    fn provider_name(&self) -> &'static str;
}
