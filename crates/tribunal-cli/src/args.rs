use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tribunal",
    version,
    about = "Benchmark LLM scenarios and grade every response with a jury of judge models"
)]
pub struct Cli {
    /// Scenario definitions, one JSON object per line
    pub scenario_file: PathBuf,

    /// Candidate model roster, one JSON object per line
    #[arg(long, default_value = "models.jsonl")]
    pub model_file: PathBuf,

    /// Judge panel roster, one JSON object per line
    #[arg(long, default_value = "judges.jsonl")]
    pub judge_file: PathBuf,

    /// Directory for run CSVs and unprocessed side files
    #[arg(long, default_value = "benchmark-results")]
    pub output_dir: PathBuf,

    /// Label stamped into run file names
    #[arg(long, default_value = "default")]
    pub experiment_name: String,

    /// Concurrent scenario workers
    #[arg(long, default_value_t = 4)]
    pub parallel_calls: usize,

    /// Invocations per scenario within one run
    #[arg(long, default_value_t = 2)]
    pub invocations_per_scenario: u32,

    /// Seconds to pause between invocations of the same scenario
    #[arg(long, default_value_t = 3)]
    pub sleep_between_invocations: u64,

    /// Quarter-step temperature variations around each scenario's base
    #[arg(long, default_value_t = 0)]
    pub temperature_variations: u32,

    /// How many times to repeat the whole scenario matrix
    #[arg(long, default_value_t = 2)]
    pub experiment_counts: u32,

    /// Extra grading metrics, comma separated
    #[arg(long)]
    pub user_defined_metrics: Option<String>,

    /// Per-metric passing threshold (0-5)
    #[arg(long, default_value_t = 3.0)]
    pub yard_stick: f64,

    /// Forward vision payloads to the transport
    #[arg(long)]
    pub vision: bool,

    /// Inference transport: openai or fake
    #[arg(long, default_value = "openai")]
    pub provider: String,

    /// Also write a machine-readable summary.json next to the run CSVs
    #[arg(long)]
    pub report: bool,
}
