use thiserror::Error;

/// Error del dominio: todas las reglas de validación terminan aquí.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    ValidationError(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
    #[error("unknown value '{value}' for {field}")]
    UnknownValue { field: &'static str, value: String },
    #[error("invalid cost range: {0}")]
    InvalidCostRange(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::ValidationError(msg.into())
    }
}
