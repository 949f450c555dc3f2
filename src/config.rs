//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y las traduce a un
//! `AppConfig` inmutable. Ninguna variable mal formada provoca un panic:
//! todo error vuelve como `AppError::Config`.

use autotech_core::GateMode;
use autotech_persistence::DbConfig;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::AppError;

pub const DEFAULT_DATA_DIR: &str = ".autotech";
pub const DEFAULT_STORAGE_KEY: &str = "vehicleData";

/// Backend que respalda el catálogo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Archivo JSON local sembrado con el catálogo de demo.
    #[default]
    Local,
    /// Postgres a través de `RemoteDataClient`.
    Remote,
}

impl FromStr for Backend {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" => Ok(Backend::Remote),
            other => Err(AppError::Config(format!("CATALOG_BACKEND must be 'local' or 'remote', got '{other}'"))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Remote => f.write_str("remote"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub admin_gate: GateMode,
    /// Sólo presente cuando hay `DATABASE_URL`; obligatoria con backend remoto.
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        autotech_persistence::init_dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Igual que `from_env`, pero leyendo de una función arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match var("CATALOG_BACKEND") {
            Some(v) => v.parse()?,
            None => Backend::default(),
        };
        let admin_gate = match var("ADMIN_GATE") {
            Some(v) => v.parse().map_err(|e| AppError::Config(format!("ADMIN_GATE: {e}")))?,
            None => GateMode::default(),
        };
        let database = match var("DATABASE_URL") {
            Some(url) => Some(DbConfig { url,
                                         min_connections: parse_or(&var, "DATABASE_MIN_CONNECTIONS", 2)?,
                                         max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 16)? }),
            None => None,
        };
        if backend == Backend::Remote && database.is_none() {
            return Err(AppError::Config("CATALOG_BACKEND=remote requires DATABASE_URL".into()));
        }
        Ok(AppConfig { backend,
                       data_dir: var("CATALOG_DATA_DIR").map(PathBuf::from)
                                                        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                       storage_key: var("CATALOG_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
                       admin_gate,
                       database })
    }

    pub fn database(&self) -> Result<&DbConfig, AppError> {
        self.database
            .as_ref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".into()))
    }
}

fn parse_or<F>(var: &F, name: &str, default: u32) -> Result<u32, AppError>
    where F: Fn(&str) -> Option<String>
{
    match var(name) {
        Some(v) => v.parse()
                    .map_err(|_| AppError::Config(format!("{name} must be a positive integer, got '{v}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_to_local_enforced() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend, Backend::Local);
        assert_eq!(cfg.admin_gate, GateMode::Enforced);
        assert_eq!(cfg.data_dir, PathBuf::from(".autotech"));
        assert_eq!(cfg.storage_key, "vehicleData");
        assert!(cfg.database.is_none());
        assert!(cfg.database().is_err());
    }

    #[test]
    fn remote_requires_database_url() {
        let err = AppConfig::from_lookup(lookup(&[("CATALOG_BACKEND", "remote")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let cfg = AppConfig::from_lookup(lookup(&[("CATALOG_BACKEND", "Remote"),
                                                  ("DATABASE_URL", "postgres://localhost/autotech"),
                                                  ("DATABASE_MAX_CONNECTIONS", "4")])).unwrap();
        let db = cfg.database().unwrap();
        assert_eq!((db.min_connections, db.max_connections), (2, 4));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        for pairs in [[("CATALOG_BACKEND", "cloud")], [("ADMIN_GATE", "sometimes")]] {
            assert!(matches!(AppConfig::from_lookup(lookup(&pairs)), Err(AppError::Config(_))));
        }
        let res = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"),
                                                  ("DATABASE_MIN_CONNECTIONS", "-1")]));
        assert!(matches!(res, Err(AppError::Config(_))));
        let cfg = AppConfig::from_lookup(lookup(&[("ADMIN_GATE", "off")])).unwrap();
        assert_eq!(cfg.admin_gate, GateMode::Disabled);
    }
}
