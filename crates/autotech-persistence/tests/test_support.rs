use autotech_persistence::{build_pool, DbConfig, PgDataClient, PgPool};
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env().ok()?;
    match build_pool(&cfg.url, 1, 2) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("could not build test pool: {e}");
            None
        }
    }
});

/// `None` (y el test se salta) cuando no hay `DATABASE_URL`.
pub fn with_client<F, R>(f: F) -> Option<R>
    where F: FnOnce(PgDataClient) -> R
{
    match TEST_POOL.as_ref() {
        Some(pool) => Some(f(PgDataClient::from_pool(pool.clone()))),
        None => {
            eprintln!("skip (no DATABASE_URL)");
            None
        }
    }
}
