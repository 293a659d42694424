/// Render the grading instruction handed to each judge model. The judge is
/// asked for an integer score per metric and nothing else; score extraction
/// lives in `parse`.
pub(crate) fn grading_instruction(
    all_metrics: &[String],
    task_type: &str,
    task_criteria: &str,
    prompt: &str,
    model_response: &str,
    golden_answer: &str,
) -> String {
    let metrics_list: Vec<String> = all_metrics.iter().map(|m| format!("- {}", m)).collect();
    format!(
        "## You are an expert evaluator.\n\
         # Task: {}\n\n\
         # Task description: {}\n\n\
         # Original Prompt:\n{}\n\n\
         # Model Response:\n{}\n\n\
         # Golden (Reference) Response:\n{}\n\n\
         # Please evaluate the model response on the following metrics:\n{}\n\n\
         # For each metric, assign an integer score from 1 (worst) to 5 (best).\n\n\
         ## IMPORTANT: **Output JSON only** in this format:\n\
         ```json\n{}\n```",
        task_type,
        task_criteria,
        prompt,
        model_response,
        golden_answer,
        metrics_list.join("\n"),
        scores_schema(all_metrics)
    )
}

/// Prompt for the one-shot LLM-assisted re-extraction when the regex pass
/// finds no scores block in the judge's reply.
pub(crate) fn extraction_instruction(all_metrics: &[String], text: &str) -> String {
    format!(
        "## Instruction\n\
         Extract and return the JSON object from the given text that matches the \
         specified JSON schema. The schema is:\n\
         ```json\n{}\n```\n\
         ## Text\n{}\n\n\
         Provide your response immediately without any preamble or additional information.",
        scores_schema(all_metrics),
        text
    )
}

fn scores_schema(all_metrics: &[String]) -> String {
    let entries: Vec<String> = all_metrics
        .iter()
        .map(|m| format!("    \"{}\": <int>", m))
        .collect();
    format!("{{\n  \"scores\": {{\n{}\n  }}\n}}", entries.join(",\n"))
}
