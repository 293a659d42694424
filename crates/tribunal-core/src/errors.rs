use thiserror::Error;

/// Transport-level failures surfaced by provider clients. These never escape
/// the executor: they are folded into a record's call status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rate limited by provider (status {status}): {detail}")]
    RateLimited { status: u16, detail: String },
    #[error("provider call timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("provider server error (status {status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("provider response missing field '{0}'")]
    MissingField(&'static str),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Configuration-level failures. The only error class allowed to abort a run
/// before any tasks are dispatched.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);
