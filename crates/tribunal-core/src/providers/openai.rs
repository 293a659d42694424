use super::{InferenceClient, InferenceReply, InferenceRequest, JudgeClient, JudgeReply};
use crate::errors::TransportError;
use crate::model::GenerationConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_BASE_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// OpenAI-compatible chat-completions client. Serves both the target-model
/// and judge-call contracts against any endpoint speaking that wire format.
pub struct OpenAiCompatClient {
    pub base_url: String,
    pub api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Some(Self::new(base_url, api_key))
    }

    /// POST one chat completion, retrying retryable statuses with exponential
    /// backoff. Returns the parsed body and the number of retries consumed.
    async fn chat(
        &self,
        model_id: &str,
        content: serde_json::Value,
        config: &GenerationConfig,
    ) -> anyhow::Result<(serde_json::Value, u32)> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model_id,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
        });

        let mut retries = 0;
        loop {
            let resp = self
                .client
                .post(&url)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(classify_send_error)?;

            let status = resp.status();
            if status.is_success() {
                let parsed: serde_json::Value = resp.json().await.map_err(TransportError::Network)?;
                return Ok((parsed, retries));
            }

            let detail = resp.text().await.unwrap_or_default();
            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && retries + 1 < MAX_ATTEMPTS {
                retries += 1;
                let backoff = BACKOFF_BASE_MS * 2u64.pow(retries);
                tracing::warn!(
                    model = model_id,
                    status = status.as_u16(),
                    retries,
                    "retryable provider error, backing off {}ms",
                    backoff
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                continue;
            }

            let err = if status.as_u16() == 429 {
                TransportError::RateLimited {
                    status: status.as_u16(),
                    detail,
                }
            } else {
                TransportError::Server {
                    status: status.as_u16(),
                    detail,
                }
            };
            return Err(err.into());
        }
    }
}

/// A timed-out request is its own error kind; everything else reqwest raises
/// stays a generic network failure.
fn classify_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            seconds: REQUEST_TIMEOUT_SECS,
        }
    } else {
        TransportError::Network(e)
    }
}

/// Map the provider's usage block onto canonical (input, output) token counts.
/// OpenAI-compatible servers report `prompt_tokens`/`completion_tokens`; some
/// gateways relabel them `input_tokens`/`output_tokens`. All other probing
/// stays here, out of the core.
pub(crate) fn normalize_usage(body: &serde_json::Value) -> Option<(u64, u64)> {
    let usage = body.get("usage")?;
    let input = usage
        .get("prompt_tokens")
        .or_else(|| usage.get("input_tokens"))?
        .as_u64()?;
    let output = usage
        .get("completion_tokens")
        .or_else(|| usage.get("output_tokens"))?
        .as_u64()?;
    Some((input, output))
}

fn content_text(body: &serde_json::Value) -> Result<String, TransportError> {
    body.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(TransportError::MissingField("choices[0].message.content"))
}

#[async_trait]
impl InferenceClient for OpenAiCompatClient {
    async fn invoke(&self, req: InferenceRequest<'_>) -> anyhow::Result<InferenceReply> {
        let content = match req.vision_payload {
            Some(url) => json!([
                { "type": "text", "text": req.prompt },
                { "type": "image_url", "image_url": { "url": url.trim() } }
            ]),
            None => json!(req.prompt),
        };

        let start = Instant::now();
        let (body, retry_count) = self.chat(req.model_id, content, &req.config).await?;
        let elapsed = start.elapsed().as_secs_f64();

        let text = content_text(&body)?;
        let (input_tokens, output_tokens) =
            normalize_usage(&body).ok_or(TransportError::MissingField("usage"))?;

        // Non-streaming call: first and last byte coincide.
        let ttlb = (elapsed * 10_000.0).round() / 10_000.0;
        let throughput = if elapsed > 0.0 {
            Some(((output_tokens as f64 / elapsed) * 100.0).round() / 100.0)
        } else {
            None
        };
        let total_cost = input_tokens as f64 * (req.input_cost_per_1k / 1000.0)
            + output_tokens as f64 * (req.output_cost_per_1k / 1000.0);

        Ok(InferenceReply {
            text,
            input_tokens,
            output_tokens,
            total_runtime: elapsed,
            time_to_first_byte: Some(ttlb),
            time_to_last_byte: Some(ttlb),
            throughput_tps: throughput,
            total_cost,
            retry_count,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai-compat"
    }
}

#[async_trait]
impl JudgeClient for OpenAiCompatClient {
    async fn grade(
        &self,
        model_id: &str,
        _region: &str,
        instruction: &str,
        config: &GenerationConfig,
    ) -> anyhow::Result<JudgeReply> {
        let (body, _retries) = self.chat(model_id, json!(instruction), config).await?;
        let text = content_text(&body)?;
        let (input_tokens, output_tokens) =
            normalize_usage(&body).ok_or(TransportError::MissingField("usage"))?;
        Ok(JudgeReply {
            text,
            input_tokens,
            output_tokens,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai-compat"
    }
}
