//! appdeps CLI - install and rebuild app dependencies for Electron

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("appdeps=debug")
    } else {
        EnvFilter::new("appdeps=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Install(args) => commands::install::execute(args),
        Commands::Rebuild(args) => commands::rebuild::execute(args),
        Commands::Deps(args) => commands::deps::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
