use crate::errors::ConfigError;
use crate::model::{JudgeProfile, Scenario};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Knobs that shape a whole batch. Defaults match the CLI defaults so library
/// callers and the binary agree.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub parallel_calls: usize,
    pub invocations_per_scenario: u32,
    pub sleep_between_invocations: Duration,
    pub temperature_variations: u32,
    pub experiment_counts: u32,
    pub default_temperature: f64,
    pub top_p: f64,
    pub yard_stick: f64,
    pub vision_enabled: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel_calls: 4,
            invocations_per_scenario: 2,
            sleep_between_invocations: Duration::from_secs(3),
            temperature_variations: 0,
            experiment_counts: 2,
            default_temperature: 1.0,
            top_p: 1.0,
            yard_stick: crate::judge::DEFAULT_YARD_STICK,
            vision_enabled: false,
        }
    }
}

/// One line of the scenario JSONL file, before being crossed with the model
/// roster.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSeed {
    pub text_prompt: String,
    pub task: TaskSpec,
    #[serde(default)]
    pub golden_answer: String,
    #[serde(default = "default_expected_output_tokens")]
    pub expected_output_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vision_payload: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub task_type: String,
    pub task_criteria: String,
}

/// One line of the model JSONL file: a candidate model plus its token rates.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelProfile {
    pub model_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub input_token_cost: f64,
    pub output_token_cost: f64,
}

fn default_expected_output_tokens() -> u32 {
    200
}

fn default_region() -> String {
    "us-east-1".to_string()
}

pub fn load_scenario_seeds(path: &Path) -> Result<Vec<ScenarioSeed>, ConfigError> {
    let seeds: Vec<ScenarioSeed> = load_jsonl(path)?;
    if seeds.is_empty() {
        return Err(ConfigError(format!(
            "scenario file {} contains no scenarios",
            path.display()
        )));
    }
    Ok(seeds)
}

pub fn load_model_profiles(path: &Path) -> Result<Vec<ModelProfile>, ConfigError> {
    let models: Vec<ModelProfile> = load_jsonl(path)?;
    if models.is_empty() {
        return Err(ConfigError(format!(
            "model file {} contains no models",
            path.display()
        )));
    }
    Ok(models)
}

pub fn load_judge_profiles(path: &Path) -> Result<Vec<JudgeProfile>, ConfigError> {
    let judges: Vec<JudgeProfile> = load_jsonl(path)?;
    if judges.is_empty() {
        return Err(ConfigError(format!(
            "judge file {} contains no judges",
            path.display()
        )));
    }
    Ok(judges)
}

/// One JSON document per line; blank lines are skipped. Parse failures carry
/// the 1-based line number.
fn load_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("cannot read {}: {e}", path.display())))?;
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| {
            ConfigError(format!("{} line {}: {e}", path.display(), idx + 1))
        })?;
        out.push(item);
    }
    Ok(out)
}

/// Cross every seed with every candidate model. Vision payloads are only
/// forwarded when vision is enabled; a seed-level temperature overrides the
/// run default.
pub fn build_scenarios(
    seeds: &[ScenarioSeed],
    models: &[ModelProfile],
    settings: &RunSettings,
) -> Vec<Scenario> {
    let mut scenarios = Vec::with_capacity(seeds.len() * models.len());
    for seed in seeds {
        for model in models {
            scenarios.push(Scenario {
                prompt: seed.text_prompt.clone(),
                task_type: seed.task.task_type.clone(),
                task_criteria: seed.task.task_criteria.clone(),
                golden_answer: seed.golden_answer.clone(),
                model_id: model.model_id.clone(),
                region: model.region.clone(),
                expected_output_tokens: seed.expected_output_tokens,
                temperature: seed.temperature.unwrap_or(settings.default_temperature),
                top_p: settings.top_p,
                vision_payload: if settings.vision_enabled {
                    seed.vision_payload.clone()
                } else {
                    None
                },
                input_token_cost: model.input_token_cost,
                output_token_cost: model.output_token_cost,
            });
        }
    }
    scenarios
}

/// Comma-separated metric names from the CLI; interior spaces become hyphens
/// so metric keys stay single tokens in reports.
pub fn parse_user_metrics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| m.replace(' ', "-"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_scenario_seeds_with_defaults() {
        let f = write_file(concat!(
            r#"{"text_prompt": "What is 2+2?", "task": {"task_type": "math", "task_criteria": "exact"}, "golden_answer": "4"}"#,
            "\n\n",
            r#"{"text_prompt": "p2", "task": {"task_type": "qa", "task_criteria": "c"}, "expected_output_tokens": 512, "temperature": 0.2}"#,
            "\n",
        ));
        let seeds = load_scenario_seeds(f.path()).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].expected_output_tokens, 200);
        assert_eq!(seeds[0].temperature, None);
        assert_eq!(seeds[1].expected_output_tokens, 512);
        assert_eq!(seeds[1].temperature, Some(0.2));
    }

    #[test]
    fn empty_scenario_file_is_a_config_error() {
        let f = write_file("\n\n");
        let err = load_scenario_seeds(f.path()).unwrap_err();
        assert!(err.0.contains("no scenarios"));
    }

    #[test]
    fn parse_error_reports_the_line_number() {
        let f = write_file("{\"text_prompt\": \"ok\", \"task\": {\"task_type\": \"t\", \"task_criteria\": \"c\"}}\nnot json\n");
        let err = load_scenario_seeds(f.path()).unwrap_err();
        assert!(err.0.contains("line 2"), "{}", err.0);
    }

    #[test]
    fn builds_the_seed_model_cross_product() {
        let seeds = vec![ScenarioSeed {
            text_prompt: "p".into(),
            task: TaskSpec {
                task_type: "qa".into(),
                task_criteria: "c".into(),
            },
            golden_answer: "g".into(),
            expected_output_tokens: 200,
            temperature: None,
            vision_payload: Some("https://example.com/cat.png".into()),
        }];
        let models = vec![
            ModelProfile {
                model_id: "m1".into(),
                region: "us-east-1".into(),
                input_token_cost: 0.001,
                output_token_cost: 0.002,
            },
            ModelProfile {
                model_id: "m2".into(),
                region: "eu-west-1".into(),
                input_token_cost: 0.003,
                output_token_cost: 0.004,
            },
        ];
        let settings = RunSettings::default();
        let scenarios = build_scenarios(&seeds, &models, &settings);
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].model_id, "m1");
        assert_eq!(scenarios[1].region, "eu-west-1");
        assert_eq!(scenarios[0].temperature, 1.0);
        // Vision disabled by default: payload stripped.
        assert_eq!(scenarios[0].vision_payload, None);

        let scenarios = build_scenarios(
            &seeds,
            &models,
            &RunSettings {
                vision_enabled: true,
                ..RunSettings::default()
            },
        );
        assert!(scenarios[0].vision_payload.is_some());
    }

    #[test]
    fn user_metrics_are_trimmed_and_hyphenated() {
        assert_eq!(
            parse_user_metrics("Tone, Domain Accuracy , ,Safety"),
            vec!["Tone", "Domain-Accuracy", "Safety"]
        );
        assert!(parse_user_metrics("").is_empty());
    }

    #[test]
    fn loads_judge_profiles() {
        let f = write_file(
            r#"{"model_id": "j1", "region": "us-east-1", "input_cost_per_1k": 0.003, "output_cost_per_1k": 0.015}"#,
        );
        let judges = load_judge_profiles(f.path()).unwrap();
        assert_eq!(judges[0].model_id, "j1");
    }
}
