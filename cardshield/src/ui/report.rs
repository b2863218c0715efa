// cardshield/src/ui/report.rs
//! Human-readable rendering of a collection analysis as tables.

use anyhow::Result;
use cardshield_core::CollectionAnalysis;
use chrono::{SecondsFormat, Utc};
use comfy_table::{Cell, CellAlignment, Table};
use owo_colors::OwoColorize;
use std::io::Write;

use crate::ui::theme::{color_of, ThemeEntry, ThemeMap};

/// Longest error message shown in the invalid-payload table.
const MAX_ERROR_CHARS: usize = 80;

fn new_table(headers: &[&str], supports_color: bool) -> Table {
    let mut table = Table::new();
    if !supports_color {
        table.force_no_tty();
    }
    table.set_header(headers.to_vec());
    table
}

fn heading<W: Write>(writer: &mut W, text: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    if supports_color {
        writeln!(writer, "\n{}", text.color(color_of(theme, ThemeEntry::Header)).bold())?;
    } else {
        writeln!(writer, "\n{}", text)?;
    }
    Ok(())
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn count_cell(value: impl ToString) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

pub fn print_analysis<W: Write>(
    analysis: &CollectionAnalysis,
    writer: &mut W,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<()> {
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    heading(
        writer,
        &format!("Collection report (generated {generated_at})"),
        theme,
        supports_color,
    )?;

    let stats = &analysis.stats;
    let mut summary = new_table(&["Metric", "Value"], supports_color);
    summary
        .add_row(vec![Cell::new("Valid cards"), count_cell(analysis.valid_cards.len())])
        .add_row(vec![Cell::new("Invalid payloads"), count_cell(analysis.invalid_count)])
        .add_row(vec![Cell::new("Total sections"), count_cell(stats.total_sections)])
        .add_row(vec![
            Cell::new("Avg sections per card"),
            count_cell(format!("{:.2}", stats.avg_sections_per_card)),
        ])
        .add_row(vec![Cell::new("Cards with actions"), count_cell(stats.cards_with_actions)]);
    writeln!(writer, "{summary}")?;

    if !stats.by_type.is_empty() {
        heading(writer, "Cards by type", theme, supports_color)?;
        let mut by_type = new_table(&["Type", "Cards"], supports_color);
        for (kind, count) in &stats.by_type {
            by_type.add_row(vec![Cell::new(kind), count_cell(count)]);
        }
        writeln!(writer, "{by_type}")?;
    }

    if !analysis.duplicates.is_empty() {
        heading(writer, "Duplicate titles", theme, supports_color)?;
        let mut duplicates = new_table(&["Title", "Count", "Positions"], supports_color);
        for group in &analysis.duplicates {
            let positions: Vec<String> = group.indices.iter().map(ToString::to_string).collect();
            duplicates.add_row(vec![
                Cell::new(&group.title),
                count_cell(group.size()),
                Cell::new(positions.join(", ")),
            ]);
        }
        writeln!(writer, "{duplicates}")?;
    }

    if !analysis.invalid.is_empty() {
        heading(writer, "Invalid payloads", theme, supports_color)?;
        let mut invalid = new_table(&["Index", "Error"], supports_color);
        for entry in &analysis.invalid {
            invalid.add_row(vec![count_cell(entry.index), Cell::new(shorten(&entry.error, MAX_ERROR_CHARS))]);
        }
        writeln!(writer, "{invalid}")?;
    }

    heading(writer, "Issues", theme, supports_color)?;
    if analysis.issues.is_empty() {
        writeln!(writer, "No issues found.")?;
    }
    for issue in &analysis.issues {
        if supports_color {
            writeln!(writer, "- {}", issue.color(color_of(theme, ThemeEntry::Warn)))?;
        } else {
            writeln!(writer, "- {}", issue)?;
        }
    }
    Ok(())
}
