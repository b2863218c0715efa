// cardshield/src/commands/analyze.rs
//! `cardshield analyze`: collection report over many payloads.

use anyhow::Result;
use cardshield_core::analyze_collection;
use is_terminal::IsTerminal;
use log::{debug, info};
use serde_json::value::RawValue;
use std::io;
use std::process::ExitCode;

use crate::cli::AnalyzeCommand;
use crate::commands::common::{read_input, to_json, write_output, RunContext};
use crate::ui::report;

/// Splits one input document into payloads.
///
/// A top-level JSON array yields one payload per element, each keeping its
/// original text so the per-payload size ceiling sees what was sent.
/// Anything else, including text that does not parse, is a single payload.
pub fn split_payloads(text: &str) -> Vec<String> {
    if text.trim_start().starts_with('[') {
        if let Ok(entries) = serde_json::from_str::<Vec<Box<RawValue>>>(text) {
            return entries.iter().map(|entry| entry.get().to_string()).collect();
        }
    }
    vec![text.to_string()]
}

fn collect_payloads(cmd: &AnalyzeCommand, ctx: &RunContext<'_>) -> Result<Vec<String>> {
    let limit = ctx.pipeline.limits().max_batch_bytes;
    match cmd.input_files.as_slice() {
        [] => Ok(split_payloads(&read_input(None, limit)?)),
        [single] => Ok(split_payloads(&read_input(Some(single), limit)?)),
        many => many.iter().map(|path| read_input(Some(path), limit)).collect(),
    }
}

pub fn run_analyze(cmd: &AnalyzeCommand, ctx: &RunContext<'_>) -> Result<ExitCode> {
    info!("Starting analyze operation.");
    let payloads = collect_payloads(cmd, ctx)?;
    debug!("Collected {} payloads.", payloads.len());

    let analysis = analyze_collection(&payloads, &ctx.pipeline);

    if cmd.json {
        write_output(None, &to_json(&analysis, false)?, ctx)?;
    } else {
        let stdout = io::stdout();
        let supports_color = stdout.is_terminal();
        report::print_analysis(&analysis, &mut stdout.lock(), ctx.theme, supports_color)?;
    }

    if cmd.fail_on_invalid && analysis.invalid_count > 0 {
        ctx.warn_msg(format!("{} of {} payloads are invalid.", analysis.invalid_count, payloads.len()));
        return Ok(ExitCode::FAILURE);
    }
    info!("Analyze operation completed.");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_are_split_into_payloads() {
        let payloads = split_payloads(r#"[{ "title": "a" }, { "title": "b" }, 3]"#);
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0], r#"{ "title": "a" }"#);
        assert_eq!(payloads[2], "3");
    }

    #[test]
    fn non_arrays_are_one_payload() {
        assert_eq!(split_payloads(r#"{ "title": "a" }"#).len(), 1);
        assert_eq!(split_payloads("not json").len(), 1);
        assert_eq!(split_payloads("[1, oops").len(), 1);
    }
}
