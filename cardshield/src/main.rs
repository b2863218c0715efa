// cardshield/src/main.rs
//! CardShield entry point.
//!
//! Parses arguments, initializes logging and the output theme, then hands
//! off to the selected subcommand.

use cardshield::cli::Cli;
use cardshield::commands::common::error_msg;
use cardshield::logger;
use cardshield::ui::theme::{build_theme_map, ThemeStyle};
use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Some(LevelFilter::Off)
    } else if cli.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    let theme = match build_theme_map(cli.theme.as_deref()) {
        Ok(theme) => theme,
        Err(e) => {
            error_msg(format!("{:#}", e), &ThemeStyle::default_theme_map());
            return ExitCode::FAILURE;
        }
    };

    match cardshield::run(&cli, &theme) {
        Ok(code) => code,
        Err(e) => {
            error_msg(format!("{:#}", e), &theme);
            ExitCode::FAILURE
        }
    }
}
