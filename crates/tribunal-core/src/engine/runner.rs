use super::executor::Executor;
use crate::model::{BenchmarkRecord, Scenario, UnprocessedRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Worker pool bound; at most this many scenario tasks run at once.
    pub parallel_calls: usize,
    /// Sequential repeats of each scenario inside its task.
    pub invocations_per_scenario: u32,
    /// Pacing delay between a scenario's invocations.
    pub sleep_between_invocations: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel_calls: 4,
            invocations_per_scenario: 2,
            sleep_between_invocations: Duration::from_secs(3),
        }
    }
}

/// What one batch produced: successful records, and everything that was not
/// processed to completion. Failures are quarantined, never dropped.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<BenchmarkRecord>,
    pub unprocessed: Vec<UnprocessedRecord>,
}

/// Drives all expanded scenarios across a bounded worker pool. The only
/// component aware of parallelism: the executor underneath it is a pure
/// request/response unit.
pub struct Runner {
    pub executor: Arc<Executor>,
    pub policy: RunPolicy,
}

impl Runner {
    pub fn new(executor: Arc<Executor>, policy: RunPolicy) -> Self {
        Self { executor, policy }
    }

    /// Run every scenario to completion. Task panics and internal errors are
    /// captured at the task boundary as unprocessed records, so one failing
    /// scenario never aborts the batch.
    pub async fn run_batch(&self, scenarios: &[Scenario]) -> BatchOutcome {
        let sem = Arc::new(Semaphore::new(self.policy.parallel_calls.max(1)));
        let outcome = Arc::new(Mutex::new(BatchOutcome::default()));
        let mut join_set = JoinSet::new();
        // Scenario per in-flight task, so a panicked task can still be
        // quarantined by id.
        let mut in_flight: HashMap<tokio::task::Id, Scenario> = HashMap::new();

        for scenario in scenarios.iter().cloned() {
            let Ok(permit) = sem.clone().acquire_owned().await else {
                // Semaphore is never closed while we hold it; unreachable in
                // practice, but do not lose the scenario if it ever happens.
                let mut out = outcome.lock().unwrap();
                out.unprocessed
                    .push(UnprocessedRecord::from_exception(&scenario, "worker pool closed"));
                continue;
            };
            let executor = self.executor.clone();
            let policy = self.policy.clone();
            let outcome = outcome.clone();
            let task_scenario = scenario.clone();
            let handle = join_set.spawn(async move {
                let _permit = permit;
                let (records, unprocessed) =
                    run_scenario_task(&executor, &policy, &task_scenario).await;
                // Lock held only for the append, never across the calls above.
                let mut out = outcome.lock().unwrap();
                out.records.extend(records);
                out.unprocessed.extend(unprocessed);
            });
            in_flight.insert(handle.id(), scenario);
        }

        while let Some(res) = join_set.join_next_with_id().await {
            match res {
                Ok((id, ())) => {
                    in_flight.remove(&id);
                }
                Err(e) => {
                    tracing::error!("scenario task join error: {e}");
                    if let Some(scenario) = in_flight.remove(&e.id()) {
                        let mut out = outcome.lock().unwrap();
                        out.unprocessed
                            .push(UnprocessedRecord::from_exception(&scenario, format!("{e}")));
                    }
                }
            }
        }

        let out = std::mem::take(&mut *outcome.lock().unwrap());
        tracing::info!(
            records = out.records.len(),
            unprocessed = out.unprocessed.len(),
            "batch complete"
        );
        out
    }
}

/// One scenario, all its invocations in strict sequence with pacing between
/// them. Infallible by construction: every failure mode lands in one of the
/// two returned lists.
async fn run_scenario_task(
    executor: &Executor,
    policy: &RunPolicy,
    scenario: &Scenario,
) -> (Vec<BenchmarkRecord>, Vec<UnprocessedRecord>) {
    let mut records = Vec::new();
    let mut unprocessed = Vec::new();

    for invocation in 0..policy.invocations_per_scenario {
        tracing::info!(
            model = %scenario.model_id,
            region = %scenario.region,
            temperature = scenario.temperature,
            invocation = invocation + 1,
            total = policy.invocations_per_scenario,
            "running scenario"
        );
        match executor.run_invocation(scenario).await {
            Ok(record) if record.api_call_status.is_success() => records.push(record),
            Ok(record) => {
                tracing::warn!(
                    model = %scenario.model_id,
                    status = record.api_call_status.as_str(),
                    "record processing failed"
                );
                let reason = format!("API error: {}", record.api_call_status.as_str());
                unprocessed.push(UnprocessedRecord::from_result(record, reason));
            }
            Err(e) => {
                tracing::error!(model = %scenario.model_id, "exception processing record: {e:#}");
                unprocessed.push(UnprocessedRecord::from_exception(scenario, format!("{e:#}")));
            }
        }

        if !policy.sleep_between_invocations.is_zero() {
            tokio::time::sleep(policy.sleep_between_invocations).await;
        }
    }

    (records, unprocessed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{JudgeService, DEFAULT_YARD_STICK};
    use crate::model::JudgeProfile;
    use crate::providers::fake::{FakeInferenceClient, FakeJudgeClient};

    fn scenario_for(model_id: &str, temperature: f64) -> Scenario {
        Scenario {
            prompt: "p".into(),
            task_type: "qa".into(),
            task_criteria: "c".into(),
            golden_answer: "g".into(),
            model_id: model_id.into(),
            region: "us-east-1".into(),
            expected_output_tokens: 32,
            temperature,
            top_p: 1.0,
            vision_payload: None,
            input_token_cost: 1.0,
            output_token_cost: 1.0,
        }
    }

    fn runner(client: FakeInferenceClient, invocations: u32) -> Runner {
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
        Runner::new(
            Arc::new(Executor::new(Arc::new(client), judge)),
            RunPolicy {
                parallel_calls: 2,
                invocations_per_scenario: invocations,
                sleep_between_invocations: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn every_scenario_invocation_yields_a_record() {
        let scenarios = vec![scenario_for("a", 0.2), scenario_for("a", 0.4), scenario_for("b", 0.2)];
        let out = runner(FakeInferenceClient::new().with_response("ok".into()), 2)
            .run_batch(&scenarios)
            .await;
        assert_eq!(out.records.len(), 6);
        assert!(out.unprocessed.is_empty());
    }

    #[tokio::test]
    async fn one_failing_scenario_is_quarantined_without_aborting_siblings() {
        let scenarios = vec![scenario_for("good", 0.2), scenario_for("bad", 0.2)];
        let out = runner(
            FakeInferenceClient::new()
                .with_response("ok".into())
                .failing_for("bad"),
            1,
        )
        .run_batch(&scenarios)
        .await;
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].scenario.model_id, "good");
        assert_eq!(out.unprocessed.len(), 1);
        assert_eq!(out.unprocessed[0].scenario.model_id, "bad");
        assert!(out.unprocessed[0].reason.starts_with("API error:"));
    }

    #[tokio::test]
    async fn failed_invocations_are_counted_per_invocation() {
        let scenarios = vec![scenario_for("bad", 0.2)];
        let out = runner(FakeInferenceClient::new().failing_for("bad"), 3)
            .run_batch(&scenarios)
            .await;
        assert!(out.records.is_empty());
        assert_eq!(out.unprocessed.len(), 3);
    }

    #[tokio::test]
    async fn panicked_task_is_quarantined_with_its_scenario() {
        let scenarios = vec![scenario_for("good", 0.2), scenario_for("crash", 0.2)];
        let out = runner(
            FakeInferenceClient::new()
                .with_response("ok".into())
                .panicking_for("crash"),
            1,
        )
        .run_batch(&scenarios)
        .await;
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].scenario.model_id, "good");
        assert_eq!(out.unprocessed.len(), 1);
        assert_eq!(out.unprocessed[0].scenario.model_id, "crash");
        assert_eq!(out.unprocessed[0].reason, "Exception during processing");
        assert!(out.unprocessed[0].exception.as_deref().unwrap().contains("panic"));
    }

    #[tokio::test]
    async fn pool_bound_of_one_still_completes_everything() {
        let scenarios: Vec<Scenario> =
            (0..5).map(|i| scenario_for(&format!("m{i}"), 0.1)).collect();
        let mut r = runner(FakeInferenceClient::new().with_response("ok".into()), 1);
        r.policy.parallel_calls = 1;
        let out = r.run_batch(&scenarios).await;
        assert_eq!(out.records.len(), 5);
    }
}
