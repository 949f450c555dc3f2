//! Selección de backend: construye el repositorio de catálogo a partir de
//! `AppConfig`. Ambos backends son última-escritura-gana, sin detección de
//! conflictos entre sesiones.

use autotech_core::{CatalogRepository, LocalCatalogRepository, LocalCatalogStore, RemoteCatalogRepository};
use autotech_persistence::{build_pool, FileKeyValueStore, PgDataClient};
use log::info;
use std::sync::Arc;

use crate::config::{AppConfig, Backend};
use crate::errors::AppError;

pub type LocalRepository = LocalCatalogRepository<FileKeyValueStore>;
pub type RemoteRepository = RemoteCatalogRepository<Arc<PgDataClient>>;

/// Catálogo local en `data_dir`, sembrado en el primer arranque.
pub fn open_local(cfg: &AppConfig) -> Result<LocalRepository, AppError> {
    let store = FileKeyValueStore::open(&cfg.data_dir)?;
    let catalog = LocalCatalogStore::open_with_key(store, &cfg.storage_key)?;
    info!("local catalog at {} ({} makes)", cfg.data_dir.display(), catalog.makes().len());
    Ok(LocalCatalogRepository::new(catalog))
}

/// Cliente Postgres con las migraciones ya aplicadas.
pub fn open_remote_client(cfg: &AppConfig) -> Result<Arc<PgDataClient>, AppError> {
    let db = cfg.database()?;
    let pool = build_pool(&db.url, db.min_connections, db.max_connections)?;
    info!("remote catalog connected (pool max={})", db.max_connections);
    Ok(Arc::new(PgDataClient::from_pool(pool)))
}

pub fn build_repository(cfg: &AppConfig) -> Result<Box<dyn CatalogRepository>, AppError> {
    let repo: Box<dyn CatalogRepository> = match cfg.backend {
        Backend::Local => Box::new(open_local(cfg)?),
        Backend::Remote => Box::new(RemoteCatalogRepository::new(open_remote_client(cfg)?)),
    };
    Ok(repo)
}

/// Cubre `autotech_domain`, `autotech_core`, ... (el filtro compara por prefijo).
pub const DEFAULT_LOG_DIRECTIVE: &str = "autotech=info";

/// Logging para binarios: `RUST_LOG` o `DEFAULT_LOG_DIRECTIVE`. También
/// recoge los registros emitidos con `log`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    // ya inicializado (p. ej. en tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
