use autotech_catalog::{AppConfig, AppError};
use autotech_cli::{execute, Cli, Context};
use clap::Parser;

fn context(dir: &std::path::Path) -> Context {
    let config = AppConfig { data_dir: dir.to_path_buf(), ..AppConfig::from_lookup(|_| None).unwrap() };
    Context { config, user_id: None }
}

fn run(ctx: &Context, args: &[&str]) -> Result<String, AppError> {
    let mut argv = vec!["autotech"];
    argv.extend_from_slice(args);
    execute(ctx, Cli::try_parse_from(argv).unwrap().command)
}

#[test]
fn list_filters_by_make_category_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let out = run(&ctx, &["list", "--make", "BMW", "--category", "key-programming"]).unwrap();
    assert!(out.contains("All Keys Lost - Key Programming"));
    assert!(out.contains("BMW"));

    let out = run(&ctx, &["list", "--query", "PCF7945", "--json"]).unwrap();
    let items: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "All Keys Lost - Key Programming");

    assert!(run(&ctx, &["list", "--category", "tuning"]).is_err());
}

#[test]
fn stats_always_lists_the_four_categories() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&context(dir.path()), &["stats"]).unwrap();
    for label in ["Key Programming", "ECU Cloning", "Dashboard", "IMMO Off", "Total"] {
        assert!(out.contains(label), "missing {label}");
    }
}

#[test]
fn admin_edits_persist_and_export_import_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    run(&ctx, &["make", "add", "Mini"]).unwrap();
    run(&ctx, &["model", "add", "Mini", "Cooper (R56)", "--years", "2006-2013"]).unwrap();
    let draft = dir.path().join("draft.json");
    std::fs::write(&draft,
                   r#"{"title": "Dash Mileage Correction", "category": "dashboard", "difficulty": "easy",
                       "timeMinutes": 30, "steps": ["Read EEPROM", " "]}"#).unwrap();
    let added = run(&ctx, &["procedure", "add", "Mini", "Cooper (R56)", "--file", draft.to_str().unwrap()]).unwrap();
    assert!(added.starts_with("added procedure"));
    assert!(run(&ctx, &["models", "Mini"]).unwrap().contains("(1 procedures)"));

    let export = dir.path().join("export.json");
    run(&ctx, &["export", "--out", export.to_str().unwrap()]).unwrap();
    run(&ctx, &["reset"]).unwrap();
    assert!(!run(&ctx, &["makes"]).unwrap().contains("Mini"));
    run(&ctx, &["import", export.to_str().unwrap()]).unwrap();
    assert!(run(&ctx, &["makes"]).unwrap().contains("Mini (1 models)"));
}

#[test]
fn remote_only_commands_are_rejected_locally() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    assert!(matches!(run(&ctx, &["feedback", "list"]), Err(AppError::Config(_))));
    assert!(matches!(run(&ctx, &["counts"]), Err(AppError::Config(_))));
    assert!(matches!(run(&ctx, &["show", "nope"]), Err(AppError::Core(_))));
}
