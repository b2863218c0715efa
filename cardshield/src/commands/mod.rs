// cardshield/src/commands/mod.rs
//! Subcommand implementations and the dispatcher that wires them to the CLI.

pub mod analyze;
pub mod common;
pub mod diff;
pub mod process;
pub mod strip_ids;

use anyhow::Result;
use log::debug;
use std::process::ExitCode;

use crate::cli::{Cli, Commands};
use crate::ui::theme::ThemeMap;
use common::{load_config, RunContext};

/// Loads configuration once and runs the selected subcommand.
pub fn run(cli: &Cli, theme: &ThemeMap) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), cli.engine)?;
    debug!("Effective configuration: {:?}", config);
    let ctx = RunContext::new(&config, theme, cli.quiet);

    match &cli.command {
        Commands::Process(cmd) => process::run_process(cmd, &ctx),
        Commands::Analyze(cmd) => analyze::run_analyze(cmd, &ctx),
        Commands::StripIds(cmd) => strip_ids::run_strip_ids(cmd, &ctx),
        Commands::Diff(cmd) => diff::run_diff(cmd, &ctx),
    }
}
