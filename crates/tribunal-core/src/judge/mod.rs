mod parse;
mod prompt;

use crate::model::{ConsensusResult, GenerationConfig, JudgeProfile, Judgment, JudgeVerdict};
use crate::providers::JudgeClient;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The fixed metric set every candidate response is graded on, before any
/// user-defined additions.
pub const STANDARD_METRICS: [&str; 6] = [
    "Correctness",
    "Completeness",
    "Relevance",
    "Format",
    "Coherence",
    "Following-instructions",
];

/// Per-metric pass threshold ("yard stick") on the 0-5 scale.
pub const DEFAULT_YARD_STICK: f64 = 3.0;

/// Generation config for judge calls; fixed so panel verdicts stay comparable
/// across scenarios.
pub const JUDGE_GENERATION: GenerationConfig = GenerationConfig {
    max_tokens: 750,
    temperature: 0.3,
    top_p: 0.9,
};

/// Everything a consensus evaluation needs about one candidate response.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub prompt: &'a str,
    pub model_response: &'a str,
    pub golden_answer: &'a str,
    pub task_type: &'a str,
    pub task_criteria: &'a str,
}

/// Runs the judge panel against one candidate response and reduces the
/// verdicts by majority vote. Holds no mutable state: identical judge replies
/// always produce an identical consensus.
#[derive(Clone)]
pub struct JudgeService {
    panel: Vec<JudgeProfile>,
    client: Arc<dyn JudgeClient>,
    user_metrics: Vec<String>,
    yard_stick: f64,
}

impl JudgeService {
    pub fn new(
        panel: Vec<JudgeProfile>,
        client: Arc<dyn JudgeClient>,
        user_metrics: Vec<String>,
        yard_stick: f64,
    ) -> Self {
        Self {
            panel,
            client,
            user_metrics,
            yard_stick,
        }
    }

    fn all_metrics(&self) -> Vec<String> {
        STANDARD_METRICS
            .iter()
            .map(|m| m.to_string())
            .chain(self.user_metrics.iter().cloned())
            .collect()
    }

    /// Evaluate one candidate response with the whole panel. Judge failures
    /// are isolated into ERROR verdicts; this call itself never fails.
    pub async fn evaluate(&self, req: EvaluationRequest<'_>) -> ConsensusResult {
        let metrics = self.all_metrics();
        let instruction = prompt::grading_instruction(
            &metrics,
            req.task_type,
            req.task_criteria,
            req.prompt,
            req.model_response,
            req.golden_answer,
        );

        let mut verdicts = Vec::with_capacity(self.panel.len());
        for judge in &self.panel {
            verdicts.push(self.judge_one(judge, &metrics, &instruction).await);
        }
        consensus(verdicts)
    }

    async fn judge_one(
        &self,
        judge: &JudgeProfile,
        metrics: &[String],
        instruction: &str,
    ) -> JudgeVerdict {
        let reply = match self
            .client
            .grade(&judge.model_id, &judge.region, instruction, &JUDGE_GENERATION)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(judge = %judge.model_id, "judge call failed: {e:#}");
                return JudgeVerdict {
                    judge_id: judge.model_id.clone(),
                    judgment: Judgment::Error,
                    scores: None,
                    explanation: format!("Error inference response: {e:#}"),
                    raw_response: String::new(),
                    input_tokens: None,
                    output_tokens: None,
                    cost: None,
                };
            }
        };

        let scores = match self.extract_scores(judge, metrics, &reply.text).await {
            Some(s) => s,
            None => {
                tracing::warn!(judge = %judge.model_id, "no scores block in judge reply");
                return JudgeVerdict {
                    judge_id: judge.model_id.clone(),
                    judgment: Judgment::Error,
                    scores: None,
                    explanation: "Error parsing response: scores JSON not found".into(),
                    raw_response: reply.text,
                    input_tokens: Some(reply.input_tokens),
                    output_tokens: Some(reply.output_tokens),
                    cost: None,
                };
            }
        };

        let failing: Vec<String> = scores
            .iter()
            .filter(|(_, score)| **score < self.yard_stick)
            .map(|(metric, _)| metric.clone())
            .collect();
        let judgment = if failing.is_empty() {
            Judgment::Pass
        } else {
            Judgment::Fail
        };
        let cost = reply.input_tokens as f64 * (judge.input_cost_per_1k / 1000.0)
            + reply.output_tokens as f64 * (judge.output_cost_per_1k / 1000.0);

        JudgeVerdict {
            judge_id: judge.model_id.clone(),
            judgment,
            scores: Some(scores),
            explanation: failing.join(";"),
            raw_response: reply.text,
            input_tokens: Some(reply.input_tokens),
            output_tokens: Some(reply.output_tokens),
            cost: Some(cost),
        }
    }

    /// Regex pass first; on a miss, one LLM-assisted re-extraction through the
    /// same judge model. The fallback's own failure just means no scores.
    async fn extract_scores(
        &self,
        judge: &JudgeProfile,
        metrics: &[String],
        text: &str,
    ) -> Option<BTreeMap<String, f64>> {
        if let Some(scores) = parse::extract_scores(text) {
            return Some(scores);
        }
        let instruction = prompt::extraction_instruction(metrics, text);
        match self
            .client
            .grade(&judge.model_id, &judge.region, &instruction, &JUDGE_GENERATION)
            .await
        {
            Ok(reply) => parse::extract_scores(&reply.text),
            Err(e) => {
                tracing::warn!(judge = %judge.model_id, "score re-extraction failed: {e:#}");
                None
            }
        }
    }
}

/// Reduce per-judge verdicts to the panel result. ERROR verdicts are excluded
/// from the vote and from per-metric averages, but stay in the detail list.
/// The comparison is a strict `pass > fail`, so a tied panel fails.
fn consensus(verdicts: Vec<JudgeVerdict>) -> ConsensusResult {
    let pass_count = verdicts
        .iter()
        .filter(|v| v.judgment == Judgment::Pass)
        .count();
    let fail_count = verdicts
        .iter()
        .filter(|v| v.judgment == Judgment::Fail)
        .count();
    let majority_judgment = if pass_count > fail_count {
        Judgment::Pass
    } else {
        Judgment::Fail
    };

    let majority_explanations: Vec<String> = verdicts
        .iter()
        .filter(|v| v.judgment == majority_judgment)
        .map(|v| v.explanation.clone())
        .collect();

    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for verdict in &verdicts {
        if let Some(scores) = &verdict.scores {
            for (metric, score) in scores {
                let entry = sums.entry(metric.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
    }
    let majority_scores: BTreeMap<String, f64> = sums
        .into_iter()
        .map(|(metric, (sum, n))| (metric, round4(sum / f64::from(n))))
        .collect();

    // Errored judges carry no cost; missing defaults to zero rather than
    // poisoning the sum.
    let eval_cost = verdicts.iter().map(|v| v.cost.unwrap_or(0.0)).sum();

    ConsensusResult {
        majority_judgment,
        majority_explanations,
        majority_scores,
        eval_cost,
        verdicts,
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
