//! juliac CLI - Compile Julia programs into native artifacts

use anyhow::Result;
use clap::Parser;
use juliac::util::Shell;
use juliac::JuliacError;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        if let Some(help) = diagnostic_help(&e) {
            eprintln!("help: {}", help);
        }
        std::process::exit(1);
    }
}

/// The help line of the first `JuliacError` in the chain, if any.
fn diagnostic_help(e: &anyhow::Error) -> Option<String> {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<JuliacError>())
        .and_then(|err| err.help())
        .map(|help| help.to_string())
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("juliac=debug")
    } else {
        EnvFilter::new("juliac=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &shell),
        Commands::Doctor(args) => commands::doctor::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
