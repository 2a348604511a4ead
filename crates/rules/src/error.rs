//! Error types for plan building, evaluation and dispatch.

use vigil_graph::StoreError;

/// Failures raised by a single algorithm invocation.
#[derive(Debug, thiserror::Error)]
pub enum AlgorithmError {
    #[error("unknown algorithm '{0}'")]
    Unknown(String),

    #[error("{algorithm}: missing parameter '{param}'")]
    MissingParameter { algorithm: String, param: String },

    #[error("{algorithm}: invalid parameter '{param}': {reason}")]
    InvalidParameter {
        algorithm: String,
        param: String,
        reason: String,
    },

    #[error("{algorithm}: invalid input: {reason}")]
    InvalidInput { algorithm: String, reason: String },
}

/// Errors that can occur while building, evaluating or applying an analytic.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticError {
    /// Invalid analytic configuration (missing root, unmapped step, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The dependency map revisits a step that is still being resolved.
    #[error("Dependency cycle detected at step {0}")]
    Cycle(String),

    /// An input slot could not be located or had no data.
    #[error("Data unavailable for input {0}")]
    DataUnavailable(String),

    /// An algorithm produced no value.
    #[error("Algorithm at step {0} returned an undefined result")]
    UndefinedResult(String),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for analytic operations.
pub type Result<T> = std::result::Result<T, AnalyticError>;
