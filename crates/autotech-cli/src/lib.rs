//! autotech-cli: superficie de línea de comandos sobre el catálogo.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{execute, Context};
