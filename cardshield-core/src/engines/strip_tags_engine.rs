// cardshield-core/src/engines/strip_tags_engine.rs
//! A `SanitizationEngine` that removes tags with `ammonia` before escaping.
//!
//! Tag contents survive except for `script` and `style`, whose contents are
//! dropped entirely. Scheme removal runs after tag removal so that tags cannot
//! be used to split a `javascript:` sequence.
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;

use crate::engine::SanitizationEngine;
use crate::errors::SanitizeError;
use crate::sanitizers::primitives;

#[derive(Debug, Default, Clone, Copy)]
pub struct StripTagsEngine;

impl StripTagsEngine {
    pub fn new() -> Self {
        Self
    }

    fn strip_tags(value: &str) -> String {
        let mut builder = ammonia::Builder::default();
        builder
            .tags(HashSet::new())
            .clean_content_tags(HashSet::from(["script", "style"]));
        builder.clean(value).to_string()
    }
}

impl SanitizationEngine for StripTagsEngine {
    fn name(&self) -> &'static str {
        "strip-tags"
    }

    fn sanitize_text(&self, value: &str, max_chars: usize) -> Result<String, SanitizeError> {
        let without_controls = primitives::strip_control_chars(value);
        let without_tags = Self::strip_tags(&without_controls);
        let without_schemes = primitives::strip_dangerous_schemes(&without_tags);
        let escaped = primitives::escape_markup(&without_schemes);
        Ok(primitives::truncate_escaped(&escaped, max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_removed_and_text_kept() {
        let engine = StripTagsEngine::new();
        assert_eq!(engine.sanitize_text("<b>bold</b> move", 100).unwrap(), "bold move");
    }

    #[test]
    fn script_content_is_dropped() {
        let engine = StripTagsEngine::new();
        let out = engine.sanitize_text("hi<script>alert(1)</script>", 100).unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn tags_cannot_split_a_scheme() {
        let engine = StripTagsEngine::new();
        let out = engine.sanitize_text("java<i></i>script:alert(1)", 100).unwrap();
        assert!(!out.contains("javascript:"));
    }

    #[test]
    fn output_is_a_fixpoint() {
        let engine = StripTagsEngine::new();
        let once = engine.sanitize_text("a < b & \"c\" <em>d</em>", 100).unwrap();
        let twice = engine.sanitize_text(&once, 100).unwrap();
        assert_eq!(once, twice);
        assert!(!once.contains('<'));
    }
}
