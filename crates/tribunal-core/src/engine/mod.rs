pub mod executor;
pub mod experiment;
pub mod runner;

pub use executor::Executor;
pub use experiment::{Experiment, ExperimentArtifacts};
pub use runner::{BatchOutcome, RunPolicy, Runner};
