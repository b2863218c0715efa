// cardshield/src/commands/diff.rs
//! `cardshield diff`: compare two payloads by their id-free content.

use anyhow::{Context, Result};
use cardshield_core::strip_card_ids;
use is_terminal::IsTerminal;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use crate::cli::DiffCommand;
use crate::commands::common::{read_input, to_json, RunContext};
use crate::ui::diff_viewer;

/// Processes one payload file and returns its id-free pretty JSON.
fn canonical_form(path: &Path, ctx: &RunContext<'_>) -> Result<String> {
    let raw = read_input(Some(path), ctx.pipeline.limits().max_payload_bytes)?;
    let processed = ctx
        .pipeline
        .process(&raw)
        .with_context(|| format!("Payload rejected: {}", path.display()))?;
    let mut json = to_json(&strip_card_ids(&processed.card), false)?;
    json.push('\n');
    Ok(json)
}

pub fn run_diff(cmd: &DiffCommand, ctx: &RunContext<'_>) -> Result<ExitCode> {
    let old = canonical_form(&cmd.old, ctx)?;
    let new = canonical_form(&cmd.new, ctx)?;

    let stdout = io::stdout();
    let supports_color = stdout.is_terminal();
    let differ = diff_viewer::print_diff(&old, &new, &mut stdout.lock(), ctx.theme, supports_color)?;

    if differ && cmd.exit_code {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
