//! Definición de la línea de comandos (clap derive).

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use autotech_catalog::Backend;

#[derive(Debug, Parser)]
#[command(name = "autotech")]
#[command(about = "Automotive service procedure catalog")]
pub struct Cli {
    /// Backend del catálogo (por defecto, CATALOG_BACKEND o local)
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Directorio del catálogo local (por defecto, CATALOG_DATA_DIR o .autotech)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Usuario que ejecuta comandos de administración en el backend remoto
    #[arg(long, env = "AUTOTECH_USER_ID")]
    pub user_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Local,
    Remote,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => Backend::Local,
            BackendArg::Remote => Backend::Remote,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List makes with their model counts
    Makes,

    /// List the models of a make
    Models {
        /// Make id (the make name on the local backend)
        make: String,
    },

    /// List procedures, filtered by vehicle, category and text
    List(ListArgs),

    /// Procedure count per category
    Stats(ScopeArgs),

    /// Show one procedure (full detail on the remote backend)
    Show {
        id: String,
        /// Variant to select (remote)
        #[arg(long)]
        variant: Option<String>,
        /// Tool guide to select (remote)
        #[arg(long)]
        guide: Option<String>,
    },

    /// Export the local catalog as JSON
    Export {
        /// Output file (stdout if absent)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace the local catalog with a JSON export
    Import { file: PathBuf },

    /// Restore the local catalog to the seed data
    Reset,

    /// Remote catalog totals
    Counts,

    #[command(subcommand)]
    Make(MakeCommand),

    #[command(subcommand)]
    Model(ModelCommand),

    #[command(subcommand)]
    Procedure(ProcedureCommand),

    #[command(subcommand)]
    Feedback(FeedbackCommand),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ScopeArgs {
    /// Restrict to one make (id)
    #[arg(long)]
    pub make: Option<String>,
    /// Restrict to one model of --make (id)
    #[arg(long, requires = "make")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// all | key-programming | ecu-cloning | dashboard | immo-off
    #[arg(short, long, default_value = "all")]
    pub category: String,
    /// Case-insensitive text search
    #[arg(short, long, default_value = "")]
    pub query: String,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum MakeCommand {
    Add { name: String },
    Rename { id: String, name: String },
    /// Delete a make and, in cascade, its models and procedures
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    Add {
        make: String,
        name: String,
        #[arg(long, default_value = "")]
        years: String,
    },
    Update {
        make: String,
        model: String,
        name: String,
        #[arg(long, default_value = "")]
        years: String,
    },
    Delete { make: String, model: String },
}

#[derive(Debug, Subcommand)]
pub enum ProcedureCommand {
    /// Add a procedure from a JSON draft file
    Add {
        make: String,
        model: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace a procedure with a JSON draft file
    Update {
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// List feedback for moderation, newest first
    List {
        /// pending | approved | rejected | all
        #[arg(long, default_value = "pending")]
        status: String,
    },
    Approve {
        id: String,
        /// Replacement content
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Reject {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete { id: String },
}
