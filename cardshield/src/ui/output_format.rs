// cardshield/src/ui/output_format.rs
//! Status messages written to stderr, colored by the active theme when the
//! stream is a terminal.

use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;

use crate::ui::theme::{color_of, ThemeEntry, ThemeMap};

fn print_message<W: Write>(
    writer: &mut W,
    prefix: &str,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<()> {
    if supports_color {
        let color = color_of(theme, entry);
        writeln!(writer, "{} {}", prefix.color(color).bold(), msg.color(color))?;
    } else {
        writeln!(writer, "{} {}", prefix, msg)?;
    }
    Ok(())
}

pub fn print_info_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[info]", msg, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[ok]", msg, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[warn]", msg, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[error]", msg, ThemeEntry::Error, theme, supports_color)
}
