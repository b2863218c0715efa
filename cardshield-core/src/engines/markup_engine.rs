// cardshield-core/src/engines/markup_engine.rs
//! A `SanitizationEngine` that keeps text verbatim and escapes markup.
//! License: MIT OR APACHE 2.0

use log::debug;

use crate::engine::SanitizationEngine;
use crate::errors::SanitizeError;
use crate::sanitizers::primitives;

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupEngine;

impl MarkupEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SanitizationEngine for MarkupEngine {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn sanitize_text(&self, value: &str, max_chars: usize) -> Result<String, SanitizeError> {
        let out = primitives::sanitize_text(value, max_chars);
        if out.len() != value.len() {
            debug!(
                target: "cardshield_core::engine",
                "markup engine rewrote value ({} -> {} bytes)",
                value.len(),
                out.len()
            );
        }
        Ok(out)
    }
}
