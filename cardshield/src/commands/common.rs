// cardshield/src/commands/common.rs
//! Helpers shared by every subcommand: configuration loading, input and
//! output handling, and themed status messages on stderr.

use anyhow::{bail, Context, Result};
use cardshield_core::{merge_config, CardPipeline, ConfigOverride, ShieldConfig};
use is_terminal::IsTerminal;
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::cli::EngineChoice;
use crate::ui::output_format;
use crate::ui::theme::ThemeMap;

/// Everything a subcommand needs besides its own arguments.
pub struct RunContext<'a> {
    pub pipeline: CardPipeline,
    pub theme: &'a ThemeMap,
    pub quiet: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &ShieldConfig, theme: &'a ThemeMap, quiet: bool) -> Self {
        Self {
            pipeline: CardPipeline::from_config(config),
            theme,
            quiet,
        }
    }

    /// Helper for printing info messages to stderr. Silent with `--quiet`.
    pub fn info_msg(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            info_msg(msg, self.theme);
        }
    }

    /// Helper for printing warning messages to stderr. Silent with `--quiet`.
    pub fn warn_msg(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            warn_msg(msg, self.theme);
        }
    }
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Built-in defaults, then the optional override file, then the `--engine` flag.
pub fn load_config(config_path: Option<&Path>, engine: Option<EngineChoice>) -> Result<ShieldConfig> {
    let defaults = ShieldConfig::load_default().context("Failed to load built-in limits")?;
    let user = config_path.map(ConfigOverride::load_from_file).transpose()?;
    let mut config = merge_config(defaults, user)?;

    if let Some(engine) = engine {
        debug!("Engine selected on the command line: {:?}", engine);
        config.engine = engine.into();
    }
    Ok(config)
}

/// Reads a whole file, or stdin when no path is given, refusing anything over `limit` bytes.
///
/// At most `limit + 1` bytes are pulled from the source, so an oversized
/// input is rejected without being buffered in full.
pub fn read_input(path: Option<&Path>, limit: usize) -> Result<String> {
    let bytes = match path {
        Some(path) => {
            info!("Reading input from file: {}", path.display());
            let file = fs::File::open(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
            read_bounded(file, limit).with_context(|| format!("Failed to read input file: {}", path.display()))?
        }
        None => {
            info!("Reading input from stdin.");
            read_bounded(io::stdin().lock(), limit).context("Failed to read from stdin")?
        }
    };
    String::from_utf8(bytes).context("Input is not valid UTF-8")
}

fn read_bounded(source: impl Read, limit: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    source.take(limit as u64 + 1).read_to_end(&mut buffer)?;
    if buffer.len() > limit {
        bail!("Input exceeds maximum allowed size ({} bytes)", limit);
    }
    Ok(buffer)
}

/// Writes `content` to a file, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, content: &str, ctx: &RunContext<'_>) -> Result<()> {
    match path {
        Some(path) => {
            ctx.info_msg(format!("Writing output to file: {}", path.display()));
            let mut file =
                fs::File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
            writeln!(file, "{}", content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            writeln!(writer, "{}", content)?;
        }
    }
    Ok(())
}

pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("Failed to serialize output")
}
