// cardshield/src/commands/process.rs
//! `cardshield process`: one payload through the full pipeline.

use anyhow::{Context, Result};
use cardshield_core::strip_card_ids;
use log::info;
use std::process::ExitCode;

use crate::cli::ProcessCommand;
use crate::commands::common::{read_input, to_json, write_output, RunContext};

pub fn run_process(cmd: &ProcessCommand, ctx: &RunContext<'_>) -> Result<ExitCode> {
    info!("Starting process operation.");
    let raw = read_input(cmd.input_file.as_deref(), ctx.pipeline.limits().max_payload_bytes)?;

    let processed = ctx.pipeline.process(&raw).context("Payload rejected")?;
    for repair in &processed.repairs {
        ctx.warn_msg(format!("Repaired payload: {}", repair));
    }
    if processed.failed_closed {
        ctx.warn_msg("Sanitization fault; the empty card was emitted instead of the payload.");
    }

    let card = if cmd.strip_ids {
        strip_card_ids(&processed.card)
    } else {
        processed.card
    };
    let json = to_json(&card, cmd.compact)?;
    write_output(cmd.output.as_deref(), &json, ctx)?;

    info!("Process operation completed.");
    Ok(ExitCode::SUCCESS)
}
