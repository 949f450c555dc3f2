//! Implementación Postgres (Diesel + r2d2) de `RemoteDataClient`.
//!
//! - Las filas viajan como `jsonb`: lectura con `to_jsonb(t)` y escritura
//!   con `jsonb_populate_record`, de modo que el core nunca ve tipos Diesel.
//! - Cascadas, claves únicas y checks viven en las migraciones; aquí sólo se
//!   traducen sus errores (`PersistenceError` → `CoreError::Conflict`).
//! - Errores transitorios (pool, serialización) se reintentan hasta 3 veces.
//! - Inserciones de varias filas van en una única transacción.

pub mod sql;

use autotech_core::remote::{Filter, Query, RemoteDataClient, Row, Table};
use autotech_core::CoreError;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::Jsonb;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{makes, models, procedure_feedback, procedures};
use sql::Statement;

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones; permite inyectar un pool real o uno de test.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        // algunos drivers reportan estos casos sólo como texto
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Hasta 3 reintentos con backoff lineal de 15ms.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

#[derive(QueryableByName)]
struct JsonRow {
    #[diesel(sql_type = Jsonb)]
    data: Value,
}

fn boxed(stmt: &Statement) -> diesel::query_builder::BoxedSqlQuery<'static, Pg, diesel::query_builder::SqlQuery> {
    let mut q = diesel::sql_query(stmt.sql.clone()).into_boxed::<Pg>();
    for v in &stmt.binds {
        q = q.bind::<Jsonb, _>(v.clone());
    }
    q
}

fn load_rows(conn: &mut PgConnection, stmt: &Statement) -> Result<Vec<Row>, PersistenceError> {
    let rows: Vec<JsonRow> = boxed(stmt).load(conn)?;
    rows.into_iter()
        .map(|r| match r.data {
            Value::Object(map) => Ok(map),
            other => Err(PersistenceError::Unknown(format!("expected a json object row, got {other}"))),
        })
        .collect()
}

pub struct PgDataClient<P: ConnectionProvider = PoolProvider> {
    provider: P,
}

impl PgDataClient<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        PgDataClient { provider: PoolProvider { pool } }
    }
}

impl<P: ConnectionProvider> PgDataClient<P> {
    pub fn new(provider: P) -> Self {
        PgDataClient { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Conteos agregados del catálogo (para `stats`).
    pub fn counts(&self) -> Result<CatalogCounts, CoreError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               catalog_counts(&mut conn)
           })?)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Row>, PersistenceError> {
        debug!("pg: {}", stmt.sql);
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            load_rows(&mut conn, stmt)
        })
    }
}

impl<P: ConnectionProvider> RemoteDataClient for PgDataClient<P> {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, CoreError> {
        let stmt = sql::select(table, query)?;
        let rows = self.query(&stmt)?;
        Ok(rows.into_iter().map(|r| sql::project(query, r)).collect())
    }

    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, CoreError> {
        let stmts = rows.iter()
                        .map(|r| sql::insert(table, r))
                        .collect::<Result<Vec<_>, _>>()?;
        let inserted = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.transaction::<_, PersistenceError, _>(|conn| {
                    let mut out = Vec::with_capacity(stmts.len());
                    for stmt in &stmts {
                        out.extend(load_rows(conn, stmt)?);
                    }
                    Ok(out)
                })
        })?;
        debug!("pg: inserted {} rows into {table}", inserted.len());
        Ok(inserted)
    }

    fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, CoreError> {
        let stmt = sql::update(table, &patch, filters)?;
        Ok(self.query(&stmt)?)
    }

    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, CoreError> {
        let stmt = sql::delete(table, filters)?;
        debug!("pg: {}", stmt.sql);
        let deleted = with_retry(|| {
            let mut conn = self.provider.connection()?;
            Ok(boxed(&stmt).execute(&mut *conn)?)
        })?;
        Ok(deleted)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub makes: i64,
    pub models: i64,
    pub procedures: i64,
    pub pending_feedback: i64,
}

pub fn catalog_counts(conn: &mut PgConnection) -> Result<CatalogCounts, PersistenceError> {
    Ok(CatalogCounts { makes: makes::table.count().get_result(conn)?,
                       models: models::table.count().get_result(conn)?,
                       procedures: procedures::table.count().get_result(conn)?,
                       pending_feedback: procedure_feedback::table.filter(procedure_feedback::status.eq("pending"))
                                                                  .count()
                                                                  .get_result(conn)? })
}

/// Construye el pool y corre las migraciones pendientes una vez.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1);
    if min > max {
        warn!("min_size > max_size ({min} > {max}), using min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min.min(max)))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DATABASE_URL` y tamaños, y construye un pool migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_only_covers_transient_errors() {
        assert!(is_retryable(&PersistenceError::SerializationConflict));
        assert!(is_retryable(&PersistenceError::Unknown("deadlock detected".into())));
        assert!(!is_retryable(&PersistenceError::UniqueViolation("makes_name_key".into())));

        let mut calls = 0;
        let res: Result<(), _> = with_retry(|| {
            calls += 1;
            Err(PersistenceError::TransientIo("pool".into()))
        });
        assert!(res.is_err());
        assert_eq!(calls, 4);
    }
}
