//! Lumetric CLI entry point: argument parsing, logging setup, and dispatch.

use clap::Parser;
use console::style;
use std::process;

mod cli;
mod commands;
mod logging;
mod progress;

use cli::{Cli, Commands};

fn main() {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::DetectRange(args) => commands::detect_range::run(args),
        Commands::DetectBeeps(args) => commands::detect_beeps::run(args),
        Commands::Info(args) => commands::info::run(args),
    };

    if let Err(err) = result {
        eprintln!("{} {err}", style("Error:").red().bold());
        process::exit(1);
    }
}
