//! Benchmark execution and jury-vote grading for LLM scenarios.
//!
//! The pipeline: JSONL scenario seeds are crossed with a candidate-model
//! roster, optionally swept across temperature variations, executed through a
//! bounded worker pool, graded metric-by-metric by a panel of judge models,
//! and persisted as per-run CSVs with failed invocations quarantined to a
//! JSON side channel.

pub mod config;
pub mod engine;
pub mod errors;
pub mod expand;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
