use crate::model::BenchmarkRecord;
use std::path::Path;

const COLUMNS: [&str; 29] = [
    "prompt",
    "task_type",
    "task_criteria",
    "golden_answer",
    "model_id",
    "region",
    "expected_output_tokens",
    "temperature",
    "top_p",
    "vision_payload",
    "input_token_cost",
    "output_token_cost",
    "api_call_status",
    "time_to_first_byte",
    "time_to_last_byte",
    "total_runtime",
    "throughput_tps",
    "input_tokens",
    "output_tokens",
    "response_cost",
    "model_response",
    "judge_success",
    "judge_explanation",
    "judge_scores",
    "judge_details",
    "evaluation_cost",
    "retry_count",
    "run_count",
    "timestamp",
];

/// Write one experiment run's records as a quoted CSV, one row per
/// (scenario, invocation). Structured judge fields are embedded as JSON.
pub fn write_records(out: &Path, records: &[BenchmarkRecord]) -> anyhow::Result<()> {
    let mut buf = String::new();
    buf.push_str(&COLUMNS.join(","));
    buf.push('\n');

    for r in records {
        let row = [
            escape(&r.scenario.prompt),
            escape(&r.scenario.task_type),
            escape(&r.scenario.task_criteria),
            escape(&r.scenario.golden_answer),
            escape(&r.scenario.model_id),
            escape(&r.scenario.region),
            r.scenario.expected_output_tokens.to_string(),
            r.scenario.temperature.to_string(),
            r.scenario.top_p.to_string(),
            escape(r.scenario.vision_payload.as_deref().unwrap_or("")),
            r.scenario.input_token_cost.to_string(),
            r.scenario.output_token_cost.to_string(),
            escape(r.api_call_status.as_str()),
            opt(r.time_to_first_byte),
            opt(r.time_to_last_byte),
            opt(r.total_runtime),
            opt(r.throughput_tps),
            opt(r.input_tokens),
            opt(r.output_tokens),
            opt(r.response_cost),
            escape(&r.model_response),
            r.judge_success.map(|b| b.to_string()).unwrap_or_default(),
            escape(&r.judge_explanation),
            escape(&serde_json::to_string(&r.judge_scores)?),
            escape(&serde_json::to_string(&r.judge_details)?),
            r.evaluation_cost.to_string(),
            r.retry_count.to_string(),
            r.run_count.to_string(),
            r.timestamp.to_rfc3339(),
        ];
        buf.push_str(&row.join(","));
        buf.push('\n');
    }

    std::fs::write(out, buf)?;
    Ok(())
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
