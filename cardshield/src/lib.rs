// cardshield/src/lib.rs
//! # CardShield CLI
//!
//! This crate provides the command-line front end for `cardshield-core`:
//! processing single payloads, analyzing collections, stripping ids and
//! diffing two payloads by content.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;

pub use commands::run;
