// cardshield-core/src/pipeline.rs
//! `pipeline.rs`
//! One-shot wrapper that runs the whole card pipeline on a raw payload:
//! validate, deep-check, sanitize, then assign ids.
//!
//! The pipeline owns its limits and engine; nothing is looked up from ambient
//! state, so two pipelines with different configurations can coexist.

use log::{debug, error, warn};
use std::sync::Arc;

use crate::config::{Limits, ShieldConfig};
use crate::diagnostics::Repair;
use crate::engine::SanitizationEngine;
use crate::engines::EngineKind;
use crate::errors::ValidationError;
use crate::identity::ensure_ids;
use crate::model::Card;
use crate::sanitizers::CardSanitizer;
use crate::validation::{check_structure, parse_and_validate};

/// The output of [`CardPipeline::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedCard {
    /// Validated, sanitized and identified card.
    pub card: Card,
    /// Repairs the validator applied to the raw payload.
    pub repairs: Vec<Repair>,
    /// True when sanitization hit a fault and the card is the empty fallback.
    pub failed_closed: bool,
}

#[derive(Debug, Clone)]
pub struct CardPipeline {
    sanitizer: CardSanitizer,
}

impl CardPipeline {
    pub fn new(limits: Limits, engine: EngineKind) -> Self {
        Self::with_engine(limits, engine.build())
    }

    pub fn with_engine(limits: Limits, engine: Arc<dyn SanitizationEngine>) -> Self {
        Self {
            sanitizer: CardSanitizer::new(limits, engine),
        }
    }

    pub fn from_config(config: &ShieldConfig) -> Self {
        Self::new(config.limits.clone(), config.engine)
    }

    pub fn limits(&self) -> &Limits {
        self.sanitizer.limits()
    }

    pub fn sanitizer(&self) -> &CardSanitizer {
        &self.sanitizer
    }

    /// Runs validate, deep-check, sanitize and `ensure_ids` on one raw payload.
    ///
    /// A card whose required text sanitizes to nothing is rejected. A
    /// sanitization fault yields the empty card, without ids, flagged as
    /// `failed_closed`.
    pub fn process(&self, raw: &str) -> Result<ProcessedCard, ValidationError> {
        let parsed = parse_and_validate(raw, self.limits())?;
        check_structure(&parsed.card, self.limits()).map_err(|violation| {
            warn!("Card failed deep structure check: {}", violation);
            ValidationError::Structure(violation)
        })?;

        let (card, failed_closed) = match self.sanitizer.try_sanitize(&parsed.card) {
            Ok(clean) => {
                check_structure(&clean, self.limits()).map_err(|violation| {
                    warn!("Card is structurally invalid after sanitization: {}", violation);
                    ValidationError::Structure(violation)
                })?;
                (ensure_ids(&clean), false)
            }
            Err(e) => {
                error!("Sanitization failed closed ({}); returning empty card.", e);
                (Card::empty(), true)
            }
        };
        debug!(
            "Processed card '{}' ({} repairs applied).",
            card.id.as_deref().unwrap_or_default(),
            parsed.repairs.len()
        );

        Ok(ProcessedCard {
            card,
            repairs: parsed.repairs,
            failed_closed,
        })
    }
}

/// Processes one payload with `limits` and the default engine.
pub fn process_card(raw: &str, limits: &Limits) -> Result<ProcessedCard, ValidationError> {
    CardPipeline::new(limits.clone(), EngineKind::default()).process(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StructureViolation;

    #[test]
    fn process_runs_every_stage() {
        let raw = r#"{
            "name": "<b>Acme</b>",
            "sections": [{ "title": "Info", "type": "info", "fields": [{ "label": "Site", "value": "x", "link": "javascript:alert(1)" }] }]
        }"#;
        let out = process_card(raw, &Limits::default()).unwrap();

        assert_eq!(out.card.title, "&lt;b&gt;Acme&lt;/b&gt;");
        assert_eq!(out.card.sections[0].fields[0].link, None);
        assert!(out.card.id.as_deref().is_some_and(|id| id.starts_with("card-")));
        assert!(out.card.sections[0].fields[0].id.is_some());
        assert_eq!(out.repairs.len(), 1);
        assert!(!out.failed_closed);
    }

    #[test]
    fn blank_item_titles_are_rejected() {
        let raw = r#"{ "title": "T", "sections": [{ "title": "S", "type": "list", "items": [{ "title": " " }] }] }"#;
        assert!(matches!(
            process_card(raw, &Limits::default()),
            Err(ValidationError::Shape(_))
        ));
    }

    #[test]
    fn too_many_actions_is_a_structure_error() {
        let actions: Vec<_> = (0..11)
            .map(|i| serde_json::json!({ "label": format!("a{i}"), "type": "copy" }))
            .collect();
        let raw = serde_json::json!({ "title": "T", "actions": actions }).to_string();
        assert_eq!(
            process_card(&raw, &Limits::default()).unwrap_err(),
            ValidationError::Structure(StructureViolation::TooManyActions { count: 11, limit: 10 })
        );
    }

    #[test]
    fn metadata_too_deep_fails_closed() {
        let limits = Limits {
            max_metadata_depth: 2,
            ..Limits::default()
        };
        let raw = r#"{ "title": "T", "metadata": { "a": { "b": { "c": 1 } } } }"#;
        let out = process_card(raw, &limits).unwrap();

        assert!(out.failed_closed);
        assert_eq!(out.card, Card::empty());
        assert_eq!(out.card.id, None);
    }

    #[test]
    fn title_that_sanitizes_to_nothing_is_rejected() {
        for raw in [r#"{ "title": "javascript:" }"#, r#"{ "title": "\u0007\u0001" }"#] {
            assert_eq!(
                process_card(raw, &Limits::default()).unwrap_err(),
                ValidationError::Structure(StructureViolation::BlankTitle {
                    path: "card".to_string()
                })
            );
        }
    }

    #[test]
    fn sibling_ids_stay_unique_through_the_pipeline() {
        let raw = r#"{ "title": "T", "sections": [
            { "id": "sec\u0001", "title": "A", "type": "info" },
            { "id": "sec", "title": "B", "type": "info" }
        ] }"#;
        let out = process_card(raw, &Limits::default()).unwrap();
        let first = out.card.sections[0].id.as_deref().unwrap();
        let second = out.card.sections[1].id.as_deref().unwrap();

        assert_eq!(first, "sec");
        assert_ne!(first, second);
        assert!(!out.failed_closed);
    }

    #[test]
    fn strip_tags_engine_is_selectable() {
        let pipeline = CardPipeline::new(Limits::default(), EngineKind::StripTags);
        let out = pipeline.process(r#"{ "title": "<b>Acme</b>" }"#).unwrap();
        assert_eq!(out.card.title, "Acme");
    }
}
