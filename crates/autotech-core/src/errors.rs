//! Errores del core. Cubren la taxonomía completa: validación, almacenamiento,
//! no encontrado e importación, más autorización y conflictos.

use autotech_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] DomainError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("import rejected: {0}")]
    Import(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    /// Errores que el usuario puede resolver reintentando la misma acción.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Storage(format!("serialization: {e}"))
    }
}
