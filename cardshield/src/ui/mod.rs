// cardshield/src/ui/mod.rs
//! Terminal output: themed status messages, diff rendering and report tables.

pub mod diff_viewer;
pub mod output_format;
pub mod report;
pub mod theme;
