// cardshield-core/src/lib.rs
//! # CardShield Core Library
//!
//! `cardshield-core` turns untrusted card payloads (a tree of sections, fields,
//! items and actions serialized as JSON) into safe, structurally valid,
//! uniquely identified trees before anything downstream renders, diffs,
//! stores or exports them.
//!
//! The library is pure and stateless. It performs no I/O beyond reading its
//! optional configuration file, and every tree transformation returns a new
//! value instead of mutating its input.
//!
//! ## Modules
//!
//! * `config`: Size, count and length ceilings plus the engine choice, loaded from YAML.
//! * `model`: The typed card tree with closed section and action kinds.
//! * `validation`: Shape predicates, the single repair pass and the deep structure check.
//! * `engine`: Defines the `SanitizationEngine` trait for the primitive text rule.
//! * `engines`: Concrete engines (`MarkupEngine`, `StripTagsEngine`).
//! * `sanitizers`: Primitive sanitizers, the metadata walker and the fail-closed `CardSanitizer`.
//! * `identity`: Assigns, strips and fingerprints node identity.
//! * `batch`: Validation, merge, dedup and statistics over collections.
//! * `pipeline`: One-shot `validate -> sanitize -> identify` wrapper.
//! * `diagnostics`: Rejection diagnostics and payload-safe debug logging.
//! * `errors`: Structured error types for every stage.
//!
//! ## Usage Example
//!
//! ```rust
//! use cardshield_core::{CardPipeline, EngineKind, ShieldConfig};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     // 1. Load the built-in limits.
//!     let config = ShieldConfig::load_default()?;
//!
//!     // 2. Build a pipeline with an explicit engine.
//!     let pipeline = CardPipeline::new(config.limits, EngineKind::Markup);
//!
//!     // 3. Process an untrusted payload.
//!     let raw = r#"{ "title": "<script>alert(1)</script>Quarterly", "sections": [] }"#;
//!     let processed = pipeline.process(raw)?;
//!
//!     assert!(!processed.card.title.contains("<script>"));
//!     assert!(processed.card.id.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Validation failures are returned as [`ValidationError`] values carrying a
//! diagnostic; nothing in the pipeline panics on hostile input. Sanitization
//! faults never escape [`CardSanitizer::sanitize`], which fails closed to
//! [`Card::empty`]. Configuration loading uses `anyhow::Result`.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod identity;
pub mod model;
pub mod pipeline;
pub mod sanitizers;
pub mod validation;

/// Re-exports the configuration types and the merge helper.
pub use config::{merge_config, ConfigOverride, LengthLimits, Limits, LimitsOverride, ShieldConfig};

/// Re-exports the error types for every stage.
pub use errors::{CardShieldError, SanitizeError, StructureViolation, ValidationError};

/// Re-exports the engine trait and its implementations.
pub use engine::SanitizationEngine;
pub use engines::{EngineKind, MarkupEngine, StripTagsEngine};

/// Re-exports the card model.
pub use model::{Action, ActionKind, Card, Contact, EmailConfig, Field, FieldValue, Item, Metadata, Section, SectionKind};

pub use diagnostics::{Repair, ShapeDiagnostic};
pub use sanitizers::CardSanitizer;
pub use validation::{
    check_structure, is_valid_card, is_valid_field, is_valid_section, parse_and_validate, validate_structure_deep,
    validate_structure_value, ParsedCard,
};
pub use identity::{ensure_ids, fingerprint, strip_card_ids, strip_ids};
pub use batch::{
    analyze_collection, deduplicate_by_content, deduplicate_by_title, merge, sanitize_many, stats, validate_many,
    CollectionAnalysis, CollectionStats, DedupReport, DuplicateGroup, InvalidEntry, MergeReport, ValidationReport,
};

/// Re-exports the one-shot pipeline.
pub use pipeline::{process_card, CardPipeline, ProcessedCard};
