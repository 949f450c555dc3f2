//! Error de nivel aplicación: agrega los errores de cada crate con `#[from]`
//! y añade los de configuración propios de los binarios.

use autotech_core::CoreError;
use autotech_domain::DomainError;
use autotech_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Código de salida para los binarios.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Core(CoreError::NotFound(_)) => 3,
            AppError::Core(CoreError::Unauthorized(_)) => 4,
            AppError::Core(CoreError::Validation(_) | CoreError::Import(_) | CoreError::Conflict(_))
            | AppError::Domain(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_lower_layers_transparently() {
        let err: AppError = CoreError::not_found("make 'Lada'").into();
        assert_eq!(err.to_string(), "not found: make 'Lada'");
        assert_eq!(err.exit_code(), 3);
        let err: AppError = PersistenceError::Config("DATABASE_URL is not set".into()).into();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(AppError::Config("x".into()).exit_code(), 2);
    }
}
