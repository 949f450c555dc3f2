use clap::Parser;

use autotech_catalog::init_tracing;
use autotech_cli::{execute, Cli, Context};

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = Context::from_cli(&cli).and_then(|ctx| execute(&ctx, cli.command));
    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
