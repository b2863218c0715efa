// cardshield/src/cli.rs
//! This file defines the command-line interface (CLI) for the cardshield application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use cardshield_core::EngineKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "cardshield",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Validate, sanitize and identify untrusted card payloads",
    long_about = "CardShield checks untrusted card payloads (JSON trees of sections, fields, items and actions) against size and shape limits, escapes or removes dangerous markup and URL schemes, and assigns stable node ids before the card is rendered, stored or diffed.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, conflicts_with = "quiet", help = "Enable debug logging.")]
    pub debug: bool,

    /// Path to a YAML file overriding the built-in limits.
    #[arg(
        long = "config",
        value_name = "FILE",
        global = true,
        env = "CARDSHIELD_CONFIG",
        help = "Path to a YAML file overriding the built-in limits."
    )]
    pub config: Option<PathBuf>,

    /// Select the text engine, overriding the configuration file.
    #[arg(long = "engine", value_name = "ENGINE", global = true, help = "Select a text engine ('markup' or 'strip-tags').")]
    pub engine: Option<EngineChoice>,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `cardshield` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs one payload through validation, sanitization and id assignment.
    #[command(about = "Validate, sanitize and identify a single card payload.")]
    Process(ProcessCommand),

    /// Reports on a collection of payloads.
    #[command(about = "Analyze a collection of card payloads and report invalid cards, duplicates and statistics.")]
    Analyze(AnalyzeCommand),

    /// Removes every `id` key from a JSON document.
    #[command(name = "strip-ids", about = "Remove every 'id' key from a JSON document.")]
    StripIds(StripIdsCommand),

    /// Shows the content difference between two payloads, ignoring ids.
    #[command(about = "Process two payloads and show a unified diff of their id-free content.")]
    Diff(DiffCommand),
}

/// Arguments for the `process` command.
#[derive(Parser, Debug)]
pub struct ProcessCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    /// Write the processed card to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Emit the card without any ids.
    #[arg(long = "strip-ids", help = "Emit the id-free form of the processed card.")]
    pub strip_ids: bool,

    /// Print compact JSON instead of pretty-printed JSON.
    #[arg(long, help = "Print compact single-line JSON.")]
    pub compact: bool,
}

/// Arguments for the `analyze` command.
#[derive(Parser, Debug)]
pub struct AnalyzeCommand {
    /// One or more input files. A single file may hold a JSON array of payloads.
    #[arg(
        long,
        short = 'i',
        value_name = "FILE",
        num_args = 1..,
        help = "Read payloads from these files (stdin if omitted). A single file may contain a JSON array of payloads."
    )]
    pub input_files: Vec<PathBuf>,

    /// Print the analysis as JSON instead of tables.
    #[arg(long, help = "Print the analysis as JSON.")]
    pub json: bool,

    /// Exit with a non-zero code if any payload is invalid.
    #[arg(long = "fail-on-invalid", help = "Exit with a non-zero code if any payload is invalid.")]
    pub fail_on_invalid: bool,
}

/// Arguments for the `strip-ids` command.
#[derive(Parser, Debug)]
pub struct StripIdsCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    /// Write output to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `diff` command.
#[derive(Parser, Debug)]
pub struct DiffCommand {
    /// The original payload.
    #[arg(value_name = "OLD", help = "Path to the original payload.")]
    pub old: PathBuf,

    /// The changed payload.
    #[arg(value_name = "NEW", help = "Path to the changed payload.")]
    pub new: PathBuf,

    /// Exit with a non-zero code when the payloads differ.
    #[arg(long = "exit-code", help = "Exit with code 1 when the payloads differ.")]
    pub exit_code: bool,
}

/// Enum for selecting the text engine.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EngineChoice {
    /// Escape every markup character (default).
    Markup,
    /// Remove tags first, then escape what remains.
    StripTags,
}

impl From<EngineChoice> for EngineKind {
    fn from(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::Markup => EngineKind::Markup,
            EngineChoice::StripTags => EngineKind::StripTags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["cardshield", "process", "--engine", "strip-tags", "-q"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.engine, Some(EngineChoice::StripTags));
        assert!(matches!(cli.command, Commands::Process(_)));
    }
}
