// cardshield/src/ui/diff_viewer.rs
//! Unified diff of two id-free card documents.
//!
//! Removed lines are shown in the theme's `diff_removed` color, added lines in
//! `diff_added`, when the writer is a terminal.

use anyhow::Result;
use diffy::{create_patch, Line as DiffLine};
use owo_colors::OwoColorize;
use std::io::Write;

use crate::ui::theme::{color_of, ThemeEntry, ThemeMap};

/// Writes a unified diff of `original` against `modified`. Returns whether they differ.
pub fn print_diff<W: Write>(
    original: &str,
    modified: &str,
    writer: &mut W,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<bool> {
    let patch = create_patch(original, modified);
    if patch.hunks().is_empty() {
        writeln!(writer, "No content differences.")?;
        return Ok(false);
    }

    let header_color = color_of(theme, ThemeEntry::DiffHeader);
    let added = color_of(theme, ThemeEntry::DiffAdded);
    let removed = color_of(theme, ThemeEntry::DiffRemoved);

    for hunk in patch.hunks() {
        let header = format!(
            "@@ -{},{} +{},{} @@",
            hunk.old_range().start(),
            hunk.old_range().len(),
            hunk.new_range().start(),
            hunk.new_range().len()
        );
        if supports_color {
            writeln!(writer, "{}", header.color(header_color))?;
        } else {
            writeln!(writer, "{}", header)?;
        }

        for line in hunk.lines() {
            let (sign, text, color) = match line {
                DiffLine::Delete(s) => ("-", *s, Some(removed)),
                DiffLine::Insert(s) => ("+", *s, Some(added)),
                DiffLine::Context(s) => (" ", *s, None),
            };
            let text = text.trim_end_matches('\n');
            match color {
                Some(color) if supports_color => writeln!(writer, "{}", format!("{sign}{text}").color(color))?,
                _ => writeln!(writer, "{sign}{text}")?,
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeStyle;

    #[test]
    fn identical_documents_report_no_change() {
        let mut out = Vec::new();
        let differ = print_diff("a\n", "a\n", &mut out, &ThemeStyle::default_theme_map(), false).unwrap();
        assert!(!differ);
        assert_eq!(String::from_utf8(out).unwrap(), "No content differences.\n");
    }

    #[test]
    fn changed_lines_are_marked() {
        let mut out = Vec::new();
        let differ = print_diff(
            "{\n  \"title\": \"Old\"\n}\n",
            "{\n  \"title\": \"New\"\n}\n",
            &mut out,
            &ThemeStyle::default_theme_map(),
            false,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(differ);
        assert!(text.contains("-  \"title\": \"Old\""));
        assert!(text.contains("+  \"title\": \"New\""));
        assert!(text.starts_with("@@ "));
    }
}
