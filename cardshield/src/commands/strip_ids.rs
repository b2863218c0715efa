// cardshield/src/commands/strip_ids.rs
//! `cardshield strip-ids`: remove every `id` key from a JSON document.

use anyhow::{Context, Result};
use cardshield_core::strip_ids;
use serde_json::Value;
use std::process::ExitCode;

use crate::cli::StripIdsCommand;
use crate::commands::common::{read_input, to_json, write_output, RunContext};

pub fn run_strip_ids(cmd: &StripIdsCommand, ctx: &RunContext<'_>) -> Result<ExitCode> {
    let raw = read_input(cmd.input_file.as_deref(), ctx.pipeline.limits().max_payload_bytes)?;

    let value: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;
    write_output(cmd.output.as_deref(), &to_json(&strip_ids(&value), false)?, ctx)?;
    Ok(ExitCode::SUCCESS)
}
