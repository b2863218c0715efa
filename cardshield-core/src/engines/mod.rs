// cardshield-core/src/engines/mod.rs
//! This module contains the sanitization engine implementations.
//!
//! Each engine is a separate file within this directory and implements the
//! `SanitizationEngine` trait. [`EngineKind`] is the configuration-facing
//! selector that builds one of them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::SanitizationEngine;

pub mod markup_engine;
pub mod strip_tags_engine;

pub use markup_engine::MarkupEngine;
pub use strip_tags_engine::StripTagsEngine;

/// Enum to select which text engine the card sanitizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Escape every markup character, keeping the text verbatim.
    #[default]
    Markup,
    /// Remove tags (and script/style content) first, then escape the rest.
    StripTags,
}

impl EngineKind {
    pub fn build(self) -> Arc<dyn SanitizationEngine> {
        match self {
            EngineKind::Markup => Arc::new(MarkupEngine::new()),
            EngineKind::StripTags => Arc::new(StripTagsEngine::new()),
        }
    }
}
