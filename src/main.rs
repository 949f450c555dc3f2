//! Demo de punta a punta sobre backends en memoria: catálogo local sembrado,
//! filtrado y búsqueda, y el circuito remoto admin → feedback → moderación →
//! detalle. Con el feature `pg_demo` y `DATABASE_URL`, también imprime los
//! conteos del catálogo en Postgres.

use std::sync::Arc;

use autotech_catalog::{init_tracing, AppConfig, AppError};
use autotech_core::auth::grant_admin;
use autotech_core::{category_counts, filter_procedures, format_time, seed_catalog, AdminGate, AdminService,
                    AuthProvider, CatalogRepository, CategoryFilter, DetailLoader, DetailSelection,
                    FeedbackService, GateMode, InMemoryAuthProvider, InMemoryDataClient, InMemoryKeyValueStore,
                    LocalCatalogRepository, LocalCatalogStore, ModerationService, ProcedureScope};
use autotech_domain::{FeedbackDraft, Relationship, ServiceCategory};
use log::info;

fn run_local_demo() -> Result<(), AppError> {
    println!("== catálogo local ==");
    let repo = LocalCatalogRepository::new(LocalCatalogStore::open(InMemoryKeyValueStore::new())?);
    for make in repo.makes()? {
        println!("{} ({} modelos)", make.name, make.model_count);
    }
    let all = repo.procedures(&ProcedureScope::All)?;
    for (category, n) in category_counts(&all) {
        println!("  {:<16} {n}", category.label());
    }
    let hits = filter_procedures(&all, CategoryFilter::All, "pcf7945");
    for p in &hits {
        println!("búsqueda 'pcf7945' -> {} [{} {}] {}",
                 p.title,
                 p.make_name.as_deref().unwrap_or("-"),
                 p.model_name.as_deref().unwrap_or("-"),
                 format_time(p.time_minutes));
    }
    let keys = filter_procedures(&all, CategoryFilter::Only(ServiceCategory::KeyProgramming), "");
    println!("key-programming: {} procedimientos", keys.len());
    Ok(())
}

fn run_remote_demo() -> Result<(), AppError> {
    println!("== circuito remoto (en memoria) ==");
    let client = Arc::new(InMemoryDataClient::new());
    let auth = InMemoryAuthProvider::new();
    let gate = AdminGate::new(GateMode::Enforced);

    let admin_user = auth.sign_up("admin@autotech.local", "Adm1n!pass", "Admin")?;
    grant_admin(&*client, &admin_user.id)?;
    let admin = AdminService::open(client.clone(), &gate, auth.current_user().as_ref())?;
    let imported = admin.catalog().import_catalog(&seed_catalog()?)?;
    info!("imported {imported} procedures");

    let ids: Vec<String> = admin.catalog()
                                .procedures(&ProcedureScope::All)?
                                .into_iter()
                                .map(|p| p.id)
                                .collect();
    let (Some(first), Some(second)) = (ids.first(), ids.get(1)) else {
        return Err(AppError::Config("seed catalog has fewer than two procedures".into()));
    };
    admin.add_link(first, second, Relationship::Recommended)?;

    auth.sign_out()?;
    let tech = auth.sign_up("tech@autotech.local", "Tech!pass1", "Tech")?;
    let draft = FeedbackDraft { procedure_id: first.clone(),
                                variant_id: None,
                                content: "Keep a battery maintainer connected while reading CAS".into(),
                                feedback_type: "tip".into() };
    let submitted = FeedbackService::new(client.clone()).submit(&tech, &draft)?;
    println!("feedback {} -> {}", submitted.id, submitted.status);

    let moderation = ModerationService::open(client.clone(), &gate, Some(&admin_user))?;
    let approved = moderation.approve(&submitted.id, None, Some("verified on E90"))?;
    println!("feedback {} -> {}", approved.id, approved.status);

    let detail = DetailLoader::new(client).load(first, &DetailSelection::default())?;
    println!("{}: {} pasos, {} enlaces, {} comentarios",
             detail.procedure.title,
             detail.steps.len(),
             detail.linked.len(),
             detail.feedback.len());
    Ok(())
}

#[cfg(feature = "pg_demo")]
fn run_pg_demo(cfg: &AppConfig) -> Result<(), AppError> {
    if cfg.database.is_none() {
        println!("pg_demo: DATABASE_URL no configurada, se omite");
        return Ok(());
    }
    let client = autotech_catalog::open_remote_client(cfg)?;
    let counts = client.counts()?;
    println!("postgres: {} marcas, {} modelos, {} procedimientos, {} feedback pendiente",
             counts.makes, counts.models, counts.procedures, counts.pending_feedback);
    Ok(())
}

fn run() -> Result<(), AppError> {
    let cfg = AppConfig::from_env()?;
    info!("backend={} admin_gate={}", cfg.backend, cfg.admin_gate);
    run_local_demo()?;
    run_remote_demo()?;
    #[cfg(feature = "pg_demo")]
    run_pg_demo(&cfg)?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
