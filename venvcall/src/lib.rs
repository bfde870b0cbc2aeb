//! venvcall CLI library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

/// Parse arguments and dispatch to the command handlers.
pub fn run_cli() -> Result<()> {
    venvcall_core::config::load_dotenv();
    venvcall_core::observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source_file,
            function,
            env,
            args,
        } => commands::run::cmd_run(&source_file, function.as_deref(), &env, &args),
        Commands::Render {
            source_file,
            function,
            use_dill,
            with_args,
        } => commands::render::cmd_render(&source_file, function.as_deref(), use_dill, with_args),
    }
}
