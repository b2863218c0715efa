// cardshield-core/src/engine.rs
//! Defines the core SanitizationEngine trait.
//!
//! The `SanitizationEngine` trait provides a pluggable interface for the
//! primitive text rule used by the recursive card sanitizer. The card walk
//! receives an engine explicitly instead of looking one up, so callers can
//! swap the markup policy without touching the per-node rules.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use crate::errors::SanitizeError;
use crate::sanitizers::primitives;

/// A pluggable sanitizer for single string values.
///
/// Implementations must be pure: the same input always yields the same
/// output, and the output must be a fixpoint (`f(f(x)) == f(x)`).
pub trait SanitizationEngine: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Makes a free-text value safe for display and bounds it to `max_chars`.
    ///
    /// An `Err` aborts the whole card walk, which then fails closed.
    fn sanitize_text(&self, value: &str, max_chars: usize) -> Result<String, SanitizeError>;

    /// Accepts an absolute URL with one of `allowed_schemes`, or drops it.
    fn sanitize_url(&self, value: &str, allowed_schemes: &[&str], max_len: usize) -> Option<String> {
        primitives::sanitize_url(value, allowed_schemes, max_len)
    }

    /// Accepts a well-formed email address in normalized form, or drops it.
    fn sanitize_email(&self, value: &str) -> Option<String> {
        primitives::sanitize_email(value)
    }
}
