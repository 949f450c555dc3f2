//! autotech-catalog
//!
//! Librería de aplicación sobre los crates del workspace:
//! - `config`: `AppConfig` a partir de variables de entorno (.env).
//! - `app`: selección de backend (`Box<dyn CatalogRepository>`) y logging.
//! - `errors`: `AppError`, que agrega los errores de cada capa.

pub mod app;
pub mod config;
pub mod errors;

pub use app::{build_repository, init_tracing, open_local, open_remote_client};
pub use config::{AppConfig, Backend};
pub use errors::AppError;
