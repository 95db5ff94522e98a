use migrun_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Lifecycle JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No {0} configured for the migration task")]
    MissingTarget(&'static str),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Response URL returned HTTP {0}")]
    HttpStatus(u16),
}
