use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use tribunal_core::config::{
    self, build_scenarios, parse_user_metrics, RunSettings,
};
use tribunal_core::engine::{Executor, Experiment, RunPolicy, Runner};
use tribunal_core::expand::expand_scenarios;
use tribunal_core::judge::JudgeService;
use tribunal_core::providers::fake::{FakeInferenceClient, FakeJudgeClient};
use tribunal_core::providers::openai::OpenAiCompatClient;
use tribunal_core::providers::{InferenceClient, JudgeClient};
use tribunal_core::report::{self, console, RunSummary};

mod args;

use args::Cli;

const CONFIG_ERROR: i32 = 2;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = RunSettings {
        parallel_calls: cli.parallel_calls,
        invocations_per_scenario: cli.invocations_per_scenario,
        sleep_between_invocations: Duration::from_secs(cli.sleep_between_invocations),
        temperature_variations: cli.temperature_variations,
        experiment_counts: cli.experiment_counts,
        yard_stick: cli.yard_stick,
        vision_enabled: cli.vision,
        ..RunSettings::default()
    };

    let seeds = config::load_scenario_seeds(&cli.scenario_file)?;
    let models = config::load_model_profiles(&cli.model_file)?;
    let judges = config::load_judge_profiles(&cli.judge_file)?;
    let user_metrics = cli
        .user_defined_metrics
        .as_deref()
        .map(parse_user_metrics)
        .unwrap_or_default();

    let base = build_scenarios(&seeds, &models, &settings);
    let scenarios = expand_scenarios(&base, settings.temperature_variations);
    tracing::info!(
        seeds = seeds.len(),
        models = models.len(),
        scenarios = scenarios.len(),
        judges = judges.len(),
        "benchmark configured"
    );

    let (inference, judge_client) = select_provider(&cli.provider)?;
    let judge = JudgeService::new(judges, judge_client, user_metrics, settings.yard_stick);
    let experiment = Experiment {
        runner: Runner::new(
            Arc::new(Executor::new(inference, judge)),
            RunPolicy {
                parallel_calls: settings.parallel_calls,
                invocations_per_scenario: settings.invocations_per_scenario,
                sleep_between_invocations: settings.sleep_between_invocations,
            },
        ),
        output_dir: cli.output_dir.clone(),
        experiment_name: cli.experiment_name.clone(),
        experiment_counts: settings.experiment_counts,
    };

    let artifacts = experiment.execute(&scenarios).await?;
    if artifacts.total_unprocessed > 0 {
        tracing::warn!(
            count = artifacts.total_unprocessed,
            "some invocations were quarantined; see the unprocessed directory"
        );
    }

    let costs = console::cost_summary(&artifacts.records, settings.invocations_per_scenario);
    console::print_summary(&costs);

    if cli.report {
        let summary = RunSummary {
            experiment_name: cli.experiment_name,
            experiment_counts: settings.experiment_counts,
            total_records: artifacts.records.len(),
            total_unprocessed: artifacts.total_unprocessed,
            run_files: artifacts
                .run_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            cost_summary: costs,
        };
        let path = cli.output_dir.join("summary.json");
        report::write_summary(&path, &summary)?;
        tracing::info!(file = %path.display(), "summary written");
    }

    Ok(())
}

fn select_provider(
    name: &str,
) -> anyhow::Result<(Arc<dyn InferenceClient>, Arc<dyn JudgeClient>)> {
    match name {
        "openai" => {
            let client = Arc::new(OpenAiCompatClient::from_env().ok_or_else(|| {
                anyhow::anyhow!("provider 'openai' requires OPENAI_API_KEY to be set")
            })?);
            Ok((client.clone(), client))
        }
        // Dry-run transport: deterministic replies, perfect scores.
        "fake" => Ok((
            Arc::new(FakeInferenceClient::new()),
            Arc::new(FakeJudgeClient::uniform_score(5)),
        )),
        other => anyhow::bail!("unknown provider '{other}' (expected 'openai' or 'fake')"),
    }
}
