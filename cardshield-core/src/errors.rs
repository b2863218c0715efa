//! errors.rs - Custom error types for the cardshield-core library.
//!
//! This module defines structured error enums for every stage of the card
//! pipeline, so callers can tell a malformed payload from an oversized one or
//! from a fault inside the sanitizer walk.
//!
//! License: MIT OR APACHE 2.0

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::ShapeDiagnostic;

/// Reasons a payload is rejected before it becomes a [`crate::model::Card`].
///
/// Every variant is produced as a returned value; the validator never panics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Payload is empty or not text.")]
    Empty,

    #[error("Payload size ({size} bytes) exceeds maximum allowed ({limit} bytes).")]
    Oversize { size: usize, limit: usize },

    #[error("Payload is not valid JSON (line {line}, column {column}): {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Payload does not have the shape of a card: {0}")]
    Shape(ShapeDiagnostic),

    #[error("Payload could not be converted into a card: {0}")]
    Conversion(String),

    #[error("Card structure check failed: {0}")]
    Structure(StructureViolation),
}

/// The first rule a typed card broke during the deep structure check.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureViolation {
    #[error("card has {count} sections, maximum is {limit}")]
    TooManySections { count: usize, limit: usize },

    #[error("section {section} has {count} fields, maximum is {limit}")]
    TooManyFields {
        section: usize,
        count: usize,
        limit: usize,
    },

    #[error("section {section} has {count} items, maximum is {limit}")]
    TooManyItems {
        section: usize,
        count: usize,
        limit: usize,
    },

    #[error("card has {count} actions, maximum is {limit}")]
    TooManyActions { count: usize, limit: usize },

    #[error("{path} has a blank title")]
    BlankTitle { path: String },

    #[error("{path} has neither a label nor a title")]
    MissingLabel { path: String },
}

/// Faults raised during the recursive sanitizer walk.
///
/// These never reach callers of [`crate::sanitizers::CardSanitizer::sanitize`];
/// they are converted into the minimal empty card there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SanitizeError {
    #[error("Metadata nesting exceeds maximum depth ({limit}).")]
    DepthExceeded { limit: usize },

    #[error("Refusing to sanitize a card over its ceilings: {0}")]
    CeilingExceeded(StructureViolation),

    #[error("Sanitization engine '{engine}' failed: {reason}")]
    Engine { engine: String, reason: String },
}

/// Top-level error for library operations that do not fit a single stage.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CardShieldError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("Failed to serialize card: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}
