use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Unsafe formula: {0}")]
    UnsafeFormula(String),

    #[error("Invalid formula: {0}")]
    InvalidFormula(String),

    #[error("Unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("Formula result is not a finite number")]
    NonFiniteResult,

    #[error("Invalid scoring configuration: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        MetricsError::Serialization(err.to_string())
    }
}
