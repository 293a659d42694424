use super::runner::Runner;
use crate::model::{BenchmarkRecord, Scenario};
use crate::report;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Repeats the full scenario matrix `experiment_counts` times and persists
/// each run's records. Persistence failures are logged and never abort the
/// remaining runs.
pub struct Experiment {
    pub runner: Runner,
    pub output_dir: PathBuf,
    pub experiment_name: String,
    pub experiment_counts: u32,
}

/// What a whole experiment batch left on disk, plus the in-memory records for
/// summary rendering.
#[derive(Debug, Default)]
pub struct ExperimentArtifacts {
    pub run_files: Vec<PathBuf>,
    pub unprocessed_files: Vec<PathBuf>,
    pub records: Vec<BenchmarkRecord>,
    pub total_unprocessed: usize,
}

impl Experiment {
    pub async fn execute(&self, scenarios: &[Scenario]) -> anyhow::Result<ExperimentArtifacts> {
        std::fs::create_dir_all(&self.output_dir)?;
        let unprocessed_dir = self.output_dir.join("unprocessed");
        std::fs::create_dir_all(&unprocessed_dir)?;

        let batch_ts = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let suffix = format!("{:04x}", rand::random::<u16>());
        let mut artifacts = ExperimentArtifacts::default();

        for run in 1..=self.experiment_counts {
            tracing::info!(run, total = self.experiment_counts, "=== experiment run ===");
            let mut outcome = self.runner.run_batch(scenarios).await;

            if !outcome.unprocessed.is_empty() {
                let ts = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
                let path = unprocessed_dir.join(format!("unprocessed_{ts}.json"));
                tracing::warn!(
                    count = outcome.unprocessed.len(),
                    file = %path.display(),
                    "writing unprocessed records"
                );
                artifacts.total_unprocessed += outcome.unprocessed.len();
                match report::unprocessed::write_unprocessed(&path, &outcome.unprocessed) {
                    Ok(()) => artifacts.unprocessed_files.push(path),
                    Err(e) => tracing::error!("failed to write unprocessed records: {e:#}"),
                }
            }

            if outcome.records.is_empty() {
                tracing::error!(run, "run produced no results; check the unprocessed records");
                continue;
            }

            report::tag_run(&mut outcome.records, run);
            let out_csv = self.run_file(run, &batch_ts, &suffix);
            match report::csv::write_records(&out_csv, &outcome.records) {
                Ok(()) => {
                    tracing::info!(run, file = %out_csv.display(), "run results saved");
                    artifacts.run_files.push(out_csv);
                }
                Err(e) => {
                    // Keep going; the next repeat still runs.
                    tracing::error!(run, "failed to write run results: {e:#}");
                }
            }
            artifacts.records.append(&mut outcome.records);
        }

        Ok(artifacts)
    }

    fn run_file(&self, run: u32, batch_ts: &str, suffix: &str) -> PathBuf {
        let name = sanitize(&self.experiment_name);
        self.output_dir
            .join(format!("invocations_{run}_{batch_ts}_{suffix}_{name}.csv"))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// Detect leftover unprocessed files from this or earlier batches, surfaced as
/// a warning at the end of a run.
pub fn unprocessed_file_count(output_dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(output_dir.join("unprocessed")) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("unprocessed_"))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Executor, RunPolicy};
    use crate::judge::{JudgeService, DEFAULT_YARD_STICK};
    use crate::model::JudgeProfile;
    use crate::providers::fake::{FakeInferenceClient, FakeJudgeClient};
    use std::sync::Arc;
    use std::time::Duration;

    fn scenario(model_id: &str) -> Scenario {
        Scenario {
            prompt: "p".into(),
            task_type: "qa".into(),
            task_criteria: "c".into(),
            golden_answer: "g".into(),
            model_id: model_id.into(),
            region: "us-east-1".into(),
            expected_output_tokens: 16,
            temperature: 0.5,
            top_p: 1.0,
            vision_payload: None,
            input_token_cost: 1.0,
            output_token_cost: 1.0,
        }
    }

    fn experiment(client: FakeInferenceClient, dir: &Path, counts: u32) -> Experiment {
        let judge = JudgeService::new(
            vec![JudgeProfile {
                model_id: "judge".into(),
                region: "us-east-1".into(),
                input_cost_per_1k: 1.0,
                output_cost_per_1k: 1.0,
            }],
            Arc::new(FakeJudgeClient::uniform_score(5)),
            Vec::new(),
            DEFAULT_YARD_STICK,
        );
        Experiment {
            runner: Runner::new(
                Arc::new(Executor::new(Arc::new(client), judge)),
                RunPolicy {
                    parallel_calls: 2,
                    invocations_per_scenario: 1,
                    sleep_between_invocations: Duration::ZERO,
                },
            ),
            output_dir: dir.to_path_buf(),
            experiment_name: "unit test".into(),
            experiment_counts: counts,
        }
    }

    #[tokio::test]
    async fn each_run_gets_its_own_tagged_csv() {
        let dir = tempfile::tempdir().unwrap();
        let exp = experiment(
            FakeInferenceClient::new().with_response("ok".into()),
            dir.path(),
            2,
        );
        let artifacts = exp.execute(&[scenario("m")]).await.unwrap();
        assert_eq!(artifacts.run_files.len(), 2);
        assert_eq!(artifacts.records.len(), 2);
        assert_eq!(artifacts.records[0].run_count, 1);
        assert_eq!(artifacts.records[1].run_count, 2);
        let name = artifacts.run_files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("invocations_1_"));
        assert!(name.ends_with("_unit-test.csv"));
    }

    #[tokio::test]
    async fn failing_scenarios_produce_a_side_file_and_no_run_csv() {
        let dir = tempfile::tempdir().unwrap();
        let exp = experiment(FakeInferenceClient::new().failing_for("m"), dir.path(), 1);
        let artifacts = exp.execute(&[scenario("m")]).await.unwrap();
        assert!(artifacts.run_files.is_empty());
        assert_eq!(artifacts.unprocessed_files.len(), 1);
        assert_eq!(artifacts.total_unprocessed, 1);
        assert_eq!(unprocessed_file_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn mixed_batch_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let exp = experiment(
            FakeInferenceClient::new()
                .with_response("ok".into())
                .failing_for("bad"),
            dir.path(),
            1,
        );
        let artifacts = exp.execute(&[scenario("good"), scenario("bad")]).await.unwrap();
        assert_eq!(artifacts.run_files.len(), 1);
        assert_eq!(artifacts.unprocessed_files.len(), 1);
        assert_eq!(artifacts.records.len(), 1);
    }
}
