//! autotech-persistence
//!
//! Backends durables del catálogo:
//! - `pg`: `RemoteDataClient` sobre Postgres (Diesel + r2d2). La integridad
//!   referencial (cascadas, claves únicas, checks) la declaran las
//!   migraciones, no el código.
//! - `fs`: almacén clave-valor en archivos para el modo demo local.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para las consultas tipadas.

pub mod config;
pub mod error;
pub mod fs;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use fs::FileKeyValueStore;
pub use pg::{build_pool, build_pool_from_env, catalog_counts, CatalogCounts, ConnectionProvider, PgDataClient, PgPool,
             PoolProvider};
