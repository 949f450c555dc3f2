//! Ejecución de comandos. Cada comando devuelve el texto a imprimir; `main`
//! sólo decide stdout/stderr y el código de salida.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use autotech_catalog::app::LocalRepository;
use autotech_catalog::{build_repository, open_local, open_remote_client, AppConfig, AppError, Backend};
use autotech_core::{category_counts, filter_procedures, format_time, AdminGate, AdminService, CatalogRepository,
                    CategoryFilter, CoreError, CurrentUser, DetailLoader, DetailSelection, DisplayProcedure,
                    ModelInfo, ModelKey, ModerationService, ProcedureDetail, ProcedureScope};
use autotech_domain::{Feedback, FeedbackStatus, Procedure, ProcedureDraft};
use log::debug;

use crate::cli::{Cli, Command, FeedbackCommand, ListArgs, MakeCommand, ModelCommand, ProcedureCommand, ScopeArgs};

pub struct Context {
    pub config: AppConfig,
    pub user_id: Option<String>,
}

impl Context {
    /// Configuración de entorno con los overrides de la línea de comandos.
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let mut config = AppConfig::from_env()?;
        if let Some(backend) = cli.backend {
            config.backend = backend.into();
        }
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(Context { config, user_id: cli.user_id.clone() })
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.user_id
            .as_ref()
            .map(|id| CurrentUser { id: id.clone(), email: String::new(), display_name: None })
    }

    fn gate(&self) -> AdminGate {
        AdminGate::new(self.config.admin_gate)
    }
}

pub fn execute(ctx: &Context, command: Command) -> Result<String, AppError> {
    debug!("command {command:?} on {} backend", ctx.config.backend);
    match command {
        Command::Makes => makes(ctx),
        Command::Models { make } => models(ctx, &make),
        Command::List(args) => list(ctx, &args),
        Command::Stats(scope) => stats(ctx, &scope),
        Command::Show { id, variant, guide } => show(ctx, &id, DetailSelection { variant_id: variant,
                                                                                  tool_guide_id: guide }),
        Command::Export { out } => export(ctx, out.as_deref()),
        Command::Import { file } => {
            let text = fs::read_to_string(&file)?;
            let mut repo = local_only(ctx, "import")?;
            repo.store_mut().import_data(&text)?;
            Ok(format!("imported {} makes from {}", repo.store().makes().len(), file.display()))
        }
        Command::Reset => {
            let mut repo = local_only(ctx, "reset")?;
            repo.store_mut().reset_to_default()?;
            Ok(format!("catalog reset to seed data ({} makes)", repo.store().makes().len()))
        }
        Command::Counts => {
            let counts = open_remote_client(&ctx.config)?.counts()?;
            Ok(format!("makes={} models={} procedures={} pending_feedback={}",
                       counts.makes, counts.models, counts.procedures, counts.pending_feedback))
        }
        Command::Make(cmd) => with_editor(ctx, |repo| make_command(repo, cmd)),
        Command::Model(cmd) => with_editor(ctx, |repo| model_command(repo, cmd)),
        Command::Procedure(cmd) => with_editor(ctx, |repo| procedure_command(repo, cmd)),
        Command::Feedback(cmd) => feedback_command(ctx, cmd),
    }
}

fn scope(args: &ScopeArgs) -> ProcedureScope {
    match (&args.make, &args.model) {
        (Some(make), Some(model)) => ProcedureScope::Model(ModelKey::new(make, model)),
        (Some(make), None) => ProcedureScope::Make(make.clone()),
        _ => ProcedureScope::All,
    }
}

fn makes(ctx: &Context) -> Result<String, AppError> {
    let repo = build_repository(&ctx.config)?;
    let mut out = String::new();
    for m in repo.makes()? {
        let _ = write!(out, "{} ({} models)", m.name, m.model_count);
        if m.id != m.name {
            let _ = write!(out, "  id={}", m.id);
        }
        out.push('\n');
    }
    Ok(out)
}

fn models(ctx: &Context, make: &str) -> Result<String, AppError> {
    let repo = build_repository(&ctx.config)?;
    let mut out = String::new();
    for m in repo.models(make)? {
        let _ = write!(out, "{} {} ({} procedures)", m.name, m.years, m.procedure_count);
        if m.id != m.name {
            let _ = write!(out, "  id={}", m.id);
        }
        out.push('\n');
    }
    Ok(out)
}

fn list(ctx: &Context, args: &ListArgs) -> Result<String, AppError> {
    let category: CategoryFilter = args.category.parse()?;
    let repo = build_repository(&ctx.config)?;
    let procedures = repo.procedures(&scope(&args.scope))?;
    let visible = filter_procedures(&procedures, category, &args.query);
    if args.json {
        return Ok(serde_json::to_string_pretty(&visible).map_err(CoreError::from)?);
    }
    let mut out = String::new();
    for p in &visible {
        let _ = writeln!(out, "{}", summary_line(p));
    }
    let _ = writeln!(out, "{} of {} procedures", visible.len(), procedures.len());
    Ok(out)
}

fn summary_line(p: &DisplayProcedure) -> String {
    let vehicle = match (&p.make_name, &p.model_name) {
        (Some(make), Some(model)) => format!("  {make} {model}"),
        (Some(make), None) => format!("  {make}"),
        _ => String::new(),
    };
    format!("{}  {}  [{}] {} {} ${}-${}{vehicle}",
            p.id,
            p.title,
            p.category.map(|c| c.label()).unwrap_or("?"),
            p.difficulty.map(|d| d.as_str()).unwrap_or("?"),
            format_time(p.time_minutes),
            p.cost.min,
            p.cost.max)
}

fn stats(ctx: &Context, args: &ScopeArgs) -> Result<String, AppError> {
    let repo = build_repository(&ctx.config)?;
    let procedures = repo.procedures(&scope(args))?;
    let mut out = String::new();
    for (category, n) in category_counts(&procedures) {
        let _ = writeln!(out, "{:<16} {n}", category.label());
    }
    let _ = writeln!(out, "{:<16} {}", "Total", procedures.len());
    Ok(out)
}

fn show(ctx: &Context, id: &str, selection: DetailSelection) -> Result<String, AppError> {
    match ctx.config.backend {
        Backend::Local => Ok(render_procedure(&build_repository(&ctx.config)?.procedure(id)?)),
        Backend::Remote => {
            let detail = DetailLoader::new(open_remote_client(&ctx.config)?).load(id, &selection)?;
            Ok(render_detail(&detail))
        }
    }
}

pub fn render_procedure(p: &DisplayProcedure) -> String {
    let mut out = summary_line(p);
    out.push('\n');
    if !p.description.is_empty() {
        let _ = writeln!(out, "{}", p.description);
    }
    if let Some(chip) = &p.chip_type {
        let _ = writeln!(out, "chip: {chip}");
    }
    if let Some(pin) = &p.pin_code {
        let _ = writeln!(out, "pin: {pin}");
    }
    if !p.tools.is_empty() {
        let _ = writeln!(out, "tools:");
        for t in &p.tools {
            let _ = writeln!(out, "  - {}{}", t.name, if t.required { "" } else { " (optional)" });
        }
    }
    push_steps(&mut out, &p.steps);
    push_notes(&mut out, &p.notes);
    out
}

fn render_detail(d: &ProcedureDetail) -> String {
    let p = &d.procedure;
    let mut out = summary_line(p);
    out.push('\n');
    if !p.description.is_empty() {
        let _ = writeln!(out, "{}", p.description);
    }
    for v in &d.variants {
        let mark = if d.selected_variant.as_deref() == Some(v.id.as_str()) { '*' } else { ' ' };
        let _ = writeln!(out, "{mark} variant {} {}", v.variant_name, v.hardware_type.as_deref().unwrap_or(""));
    }
    for g in &d.tool_guides {
        let mark = if d.selected_tool_guide.as_deref() == Some(g.id.as_str()) { '*' } else { ' ' };
        let _ = writeln!(out, "{mark} tool {}", g.tool_name);
    }
    push_steps(&mut out, &d.steps);
    push_notes(&mut out, &d.notes);
    for l in &d.linked {
        let _ = writeln!(out, "{} -> {} ({})", l.relationship, l.title, l.id);
    }
    for f in &d.feedback {
        let _ = writeln!(out, "[{}] {}", f.feedback_type.as_str(), f.content);
    }
    out
}

fn push_steps(out: &mut String, steps: &[String]) {
    for (i, s) in steps.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {s}", i + 1);
    }
}

fn push_notes(out: &mut String, notes: &[String]) {
    for n in notes {
        let _ = writeln!(out, "note: {n}");
    }
}

fn local_only(ctx: &Context, what: &str) -> Result<LocalRepository, AppError> {
    if ctx.config.backend != Backend::Local {
        return Err(AppError::Config(format!("'{what}' is only available on the local backend")));
    }
    open_local(&ctx.config)
}

fn export(ctx: &Context, out: Option<&Path>) -> Result<String, AppError> {
    let repo = local_only(ctx, "export")?;
    let text = repo.store().export_data()?;
    match out {
        Some(path) => {
            fs::write(path, text)?;
            Ok(format!("exported {} makes to {}", repo.store().makes().len(), path.display()))
        }
        None => Ok(text),
    }
}

/// Local: sin compuerta. Remoto: las mutaciones pasan por `AdminService`.
fn with_editor<F>(ctx: &Context, f: F) -> Result<String, AppError>
    where F: FnOnce(&mut dyn CatalogRepository) -> Result<String, AppError>
{
    match ctx.config.backend {
        Backend::Local => f(&mut open_local(&ctx.config)?),
        Backend::Remote => {
            let client = open_remote_client(&ctx.config)?;
            let mut admin = AdminService::open(client, &ctx.gate(), ctx.current_user().as_ref())?;
            f(admin.catalog_mut())
        }
    }
}

fn make_command(repo: &mut dyn CatalogRepository, cmd: MakeCommand) -> Result<String, AppError> {
    match cmd {
        MakeCommand::Add { name } => {
            let make = repo.add_make(&name)?;
            Ok(format!("added make {} (id={})", make.name, make.id))
        }
        MakeCommand::Rename { id, name } => {
            repo.rename_make(&id, &name)?;
            Ok(format!("renamed make {id} to {}", name.trim()))
        }
        MakeCommand::Delete { id } => {
            repo.delete_make(&id)?;
            Ok(format!("deleted make {id}"))
        }
    }
}

fn model_command(repo: &mut dyn CatalogRepository, cmd: ModelCommand) -> Result<String, AppError> {
    match cmd {
        ModelCommand::Add { make, name, years } => {
            let key = repo.add_model(&make, &ModelInfo::new(&name, &years))?;
            Ok(format!("added model {} to {make} (id={})", name.trim(), key.model_id))
        }
        ModelCommand::Update { make, model, name, years } => {
            repo.update_model(&ModelKey::new(&make, &model), &ModelInfo::new(&name, &years))?;
            Ok(format!("updated model {model}"))
        }
        ModelCommand::Delete { make, model } => {
            repo.delete_model(&ModelKey::new(&make, &model))?;
            Ok(format!("deleted model {model} of {make}"))
        }
    }
}

fn read_draft(path: &Path) -> Result<Procedure, AppError> {
    let text = fs::read_to_string(path)?;
    let draft: ProcedureDraft = serde_json::from_str(&text).map_err(|e| {
                                                                CoreError::Import(format!("invalid procedure draft \
                                                                                           {}: {e}",
                                                                                          path.display()))
                                                            })?;
    Ok(draft.into_procedure()?)
}

fn procedure_command(repo: &mut dyn CatalogRepository, cmd: ProcedureCommand) -> Result<String, AppError> {
    match cmd {
        ProcedureCommand::Add { make, model, file } => {
            let procedure = read_draft(&file)?;
            let id = repo.add_procedure(&ModelKey::new(&make, &model), procedure)?;
            Ok(format!("added procedure {id}"))
        }
        ProcedureCommand::Update { id, file } => {
            repo.update_procedure(&id, read_draft(&file)?)?;
            Ok(format!("updated procedure {id}"))
        }
        ProcedureCommand::Delete { id } => {
            repo.delete_procedure(&id)?;
            Ok(format!("deleted procedure {id}"))
        }
    }
}

fn feedback_line(f: &Feedback) -> String {
    format!("{} [{}] {} on {}: {}", f.id, f.status, f.feedback_type.as_str(), f.procedure_id, f.content)
}

fn feedback_command(ctx: &Context, cmd: FeedbackCommand) -> Result<String, AppError> {
    if ctx.config.backend != Backend::Remote {
        return Err(AppError::Config("feedback moderation requires the remote backend".into()));
    }
    let client = open_remote_client(&ctx.config)?;
    let moderation = ModerationService::open(client, &ctx.gate(), ctx.current_user().as_ref())?;
    match cmd {
        FeedbackCommand::List { status } => {
            let status: Option<FeedbackStatus> = match status.as_str() {
                "all" => None,
                other => Some(other.parse()?),
            };
            let items = moderation.list(status)?;
            Ok(items.iter().map(|f| feedback_line(f) + "\n").collect())
        }
        FeedbackCommand::Approve { id, content, notes } => {
            Ok(feedback_line(&moderation.approve(&id, content.as_deref(), notes.as_deref())?))
        }
        FeedbackCommand::Reject { id, notes } => Ok(feedback_line(&moderation.reject(&id, notes.as_deref())?)),
        FeedbackCommand::Delete { id } => {
            moderation.delete(&id)?;
            Ok(format!("deleted feedback {id}"))
        }
    }
}
