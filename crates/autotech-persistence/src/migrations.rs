//! Wrapper para correr migraciones embebidas.
//!
//! Las migraciones viven en `migrations/` de este crate y declaran la
//! integridad referencial del catálogo (`ON DELETE CASCADE`, claves únicas,
//! checks). Al construir el pool se ejecutan una vez.

use crate::error::PersistenceError;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// `gen_random_uuid()` en Postgres < 13. Sin privilegios para crear la
/// extensión se registra un aviso y se sigue: en 13+ la función es nativa.
pub fn ensure_pgcrypto(conn: &mut PgConnection) -> bool {
    match conn.batch_execute("CREATE EXTENSION IF NOT EXISTS pgcrypto;") {
        Ok(()) => true,
        Err(e) => {
            log::warn!("could not create extension pgcrypto (gen_random_uuid defaults need Postgres 13+): {e}");
            false
        }
    }
}

pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    ensure_pgcrypto(conn);
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| log::debug!("migrations applied={}", applied.len()))
        .map_err(|e| PersistenceError::Unknown(format!("migration error: {e}")))
}
