pub mod console;
pub mod csv;
pub mod unprocessed;

use crate::model::BenchmarkRecord;
use serde::Serialize;
use std::path::Path;

/// Machine-readable handoff artifact for the external reporting collaborator,
/// written when report generation was requested.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub experiment_name: String,
    pub experiment_counts: u32,
    pub total_records: usize,
    pub total_unprocessed: usize,
    pub run_files: Vec<String>,
    pub cost_summary: Vec<console::CostSummaryRow>,
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Tag one run's records with the run index before persistence.
pub fn tag_run(records: &mut [BenchmarkRecord], run: u32) {
    for r in records {
        r.run_count = run;
    }
}
