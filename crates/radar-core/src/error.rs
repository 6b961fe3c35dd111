use thiserror::Error;

/// Errors from the HTTP layer. `Status` is terminal (non-retryable HTTP
/// status), `Exhausted` means the retry budget ran out.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

#[derive(Error, Debug)]
pub enum RadarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

/// Why a single candidate could not be fully processed. The run continues;
/// these are accumulated into the run summary advisory, never raised.
#[derive(Error, Debug)]
pub enum CandidateFailure {
    #[error("document fetch failed: {0}")]
    Fetch(String),

    #[error("no structured document in filing folder")]
    NoDocument,

    #[error("document parse failed: {0}")]
    Parse(String),

    #[error("no issuer ticker in document")]
    NoTicker,
}
