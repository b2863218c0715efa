//! card.rs - The recursive card sanitizer.
//!
//! `CardSanitizer` walks a typed card and rebuilds every node from sanitized
//! parts, so the input is never mutated and no field is copied through
//! unchecked. Any fault during the walk makes [`CardSanitizer::sanitize`]
//! return [`Card::empty`] instead of a partial tree.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, error};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Limits;
use crate::engine::SanitizationEngine;
use crate::engines::EngineKind;
use crate::errors::{SanitizeError, StructureViolation};
use crate::model::{
    Action, ActionKind, Card, Contact, EmailConfig, Field, FieldValue, Item, Metadata, Section,
};
use crate::sanitizers::metadata::sanitize_metadata;
use crate::sanitizers::primitives::{LINK_SCHEMES, WEB_SCHEMES};

/// Applies the per-node rule table to whole cards.
#[derive(Debug, Clone)]
pub struct CardSanitizer {
    limits: Limits,
    engine: Arc<dyn SanitizationEngine>,
}

impl CardSanitizer {
    pub fn new(limits: Limits, engine: Arc<dyn SanitizationEngine>) -> Self {
        Self { limits, engine }
    }

    pub fn with_engine_kind(limits: Limits, kind: EngineKind) -> Self {
        Self::new(limits, kind.build())
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn engine(&self) -> &dyn SanitizationEngine {
        self.engine.as_ref()
    }

    /// Returns a sanitized deep copy of `card`, or the empty card on any fault.
    pub fn sanitize(&self, card: &Card) -> Card {
        match self.try_sanitize(card) {
            Ok(clean) => clean,
            Err(e) => {
                error!("Sanitization failed closed ({}); returning empty card.", e);
                Card::empty()
            }
        }
    }

    /// The fallible walk behind [`CardSanitizer::sanitize`].
    pub fn try_sanitize(&self, card: &Card) -> Result<Card, SanitizeError> {
        self.check_ceilings(card)?;
        let caps = &self.limits.lengths;

        let mut sections = card
            .sections
            .iter()
            .map(|section| self.section(section))
            .collect::<Result<Vec<_>, _>>()?;
        let mut actions = card
            .actions
            .iter()
            .map(|action| self.action(action))
            .collect::<Result<Vec<_>, _>>()?;
        drop_repeated_ids(sections.iter_mut().map(|section| &mut section.id));
        drop_repeated_ids(actions.iter_mut().map(|action| &mut action.id));

        let clean = Card {
            id: self.id(card.id.as_deref())?,
            title: self.text(&card.title, caps.card_title)?,
            subtitle: self.opt_text(card.subtitle.as_deref(), caps.card_subtitle)?,
            description: self.opt_text(card.description.as_deref(), caps.card_description)?,
            kind: self.opt_text(card.kind.as_deref(), caps.card_type)?,
            sections,
            actions,
            metadata: self.metadata(card.metadata.as_ref())?,
        };
        debug!(
            target: "cardshield_core::sanitizer",
            "Sanitized card with {} sections and {} actions using '{}' engine.",
            clean.sections.len(),
            clean.actions.len(),
            self.engine.name()
        );
        Ok(clean)
    }

    /// Counts are re-checked here so a direct call on unvalidated data stays bounded.
    fn check_ceilings(&self, card: &Card) -> Result<(), SanitizeError> {
        let limits = &self.limits;
        if card.sections.len() > limits.max_sections {
            return Err(SanitizeError::CeilingExceeded(StructureViolation::TooManySections {
                count: card.sections.len(),
                limit: limits.max_sections,
            }));
        }
        if card.actions.len() > limits.max_actions {
            return Err(SanitizeError::CeilingExceeded(StructureViolation::TooManyActions {
                count: card.actions.len(),
                limit: limits.max_actions,
            }));
        }
        for (index, section) in card.sections.iter().enumerate() {
            if section.fields.len() > limits.max_fields_per_section {
                return Err(SanitizeError::CeilingExceeded(StructureViolation::TooManyFields {
                    section: index,
                    count: section.fields.len(),
                    limit: limits.max_fields_per_section,
                }));
            }
            if section.items.len() > limits.max_items_per_section {
                return Err(SanitizeError::CeilingExceeded(StructureViolation::TooManyItems {
                    section: index,
                    count: section.items.len(),
                    limit: limits.max_items_per_section,
                }));
            }
        }
        Ok(())
    }

    fn section(&self, section: &Section) -> Result<Section, SanitizeError> {
        let caps = &self.limits.lengths;
        let mut fields = section
            .fields
            .iter()
            .map(|field| self.field(field))
            .collect::<Result<Vec<_>, _>>()?;
        let mut items = section
            .items
            .iter()
            .map(|item| self.item(item))
            .collect::<Result<Vec<_>, _>>()?;
        drop_repeated_ids(fields.iter_mut().map(|field| &mut field.id));
        drop_repeated_ids(items.iter_mut().map(|item| &mut item.id));

        Ok(Section {
            id: self.id(section.id.as_deref())?,
            title: self.text(&section.title, caps.section_title)?,
            kind: section.kind,
            subtitle: self.opt_text(section.subtitle.as_deref(), caps.section_subtitle)?,
            description: self.opt_text(section.description.as_deref(), caps.section_description)?,
            fields,
            items,
            metadata: self.metadata(section.metadata.as_ref())?,
        })
    }

    fn field(&self, field: &Field) -> Result<Field, SanitizeError> {
        let caps = &self.limits.lengths;
        Ok(Field {
            id: self.id(field.id.as_deref())?,
            label: self.opt_text(field.label.as_deref(), caps.field_label)?,
            title: self.opt_text(field.title.as_deref(), caps.field_label)?,
            value: self.value(&field.value)?,
            description: self.opt_text(field.description.as_deref(), caps.field_description)?,
            link: field
                .link
                .as_deref()
                .and_then(|link| self.engine.sanitize_url(link, &LINK_SCHEMES, self.limits.max_url_length)),
            email: field
                .email
                .as_deref()
                .and_then(|email| self.engine.sanitize_email(email)),
            metadata: self.metadata(field.metadata.as_ref())?,
        })
    }

    fn item(&self, item: &Item) -> Result<Item, SanitizeError> {
        let caps = &self.limits.lengths;
        Ok(Item {
            id: self.id(item.id.as_deref())?,
            title: self.text(&item.title, caps.item_title)?,
            description: self.opt_text(item.description.as_deref(), caps.item_description)?,
            value: item.value.as_ref().map(|value| self.value(value)).transpose()?,
            metadata: self.metadata(item.metadata.as_ref())?,
        })
    }

    fn value(&self, value: &FieldValue) -> Result<FieldValue, SanitizeError> {
        Ok(match value {
            FieldValue::Bool(b) => FieldValue::Bool(*b),
            FieldValue::Number(n) => FieldValue::Number(n.clone()),
            FieldValue::Text(s) => FieldValue::Text(self.text(s, self.limits.lengths.field_value)?),
            FieldValue::Object(map) => FieldValue::Object(sanitize_metadata(self.engine(), map, &self.limits)?),
        })
    }

    fn action(&self, action: &Action) -> Result<Action, SanitizeError> {
        let caps = &self.limits.lengths;
        let kind = match &action.kind {
            ActionKind::Link { url } => ActionKind::Link {
                url: url
                    .as_deref()
                    .and_then(|url| self.engine.sanitize_url(url, &WEB_SCHEMES, self.limits.max_url_length)),
            },
            ActionKind::Email { email_config } => ActionKind::Email {
                email_config: email_config.as_ref().map(|config| self.email_config(config)).transpose()?,
            },
            ActionKind::Copy => ActionKind::Copy,
            ActionKind::Callback => ActionKind::Callback,
        };

        Ok(Action {
            id: self.id(action.id.as_deref())?,
            label: self.text(&action.label, caps.action_label)?,
            icon: self.opt_text(action.icon.as_deref(), caps.action_icon)?,
            kind,
            metadata: self.metadata(action.metadata.as_ref())?,
        })
    }

    fn email_config(&self, config: &EmailConfig) -> Result<EmailConfig, SanitizeError> {
        let caps = &self.limits.lengths;
        let contact = match &config.contact {
            Some(contact) => Some(Contact {
                name: self.opt_text(contact.name.as_deref(), caps.contact_name)?,
                email: contact.email.as_deref().and_then(|email| self.engine.sanitize_email(email)),
                role: self.opt_text(contact.role.as_deref(), caps.contact_role)?,
            }),
            None => None,
        };

        Ok(EmailConfig {
            contact,
            subject: self.opt_text(config.subject.as_deref(), caps.email_subject)?,
            body: self.opt_text(config.body.as_deref(), caps.email_body)?,
            cc: self.recipients(&config.cc),
            bcc: self.recipients(&config.bcc),
        })
    }

    fn recipients(&self, addresses: &[String]) -> Vec<String> {
        addresses
            .iter()
            .filter_map(|address| self.engine.sanitize_email(address))
            .collect()
    }

    fn text(&self, value: &str, cap: usize) -> Result<String, SanitizeError> {
        self.engine.sanitize_text(value, cap)
    }

    fn opt_text(&self, value: Option<&str>, cap: usize) -> Result<Option<String>, SanitizeError> {
        value.map(|v| self.text(v, cap)).transpose()
    }

    /// Ids are text too; one that sanitizes to nothing is dropped.
    fn id(&self, value: Option<&str>) -> Result<Option<String>, SanitizeError> {
        Ok(self
            .opt_text(value, self.limits.lengths.id)?
            .filter(|id| !id.is_empty()))
    }

    fn metadata(&self, map: Option<&Metadata>) -> Result<Option<Metadata>, SanitizeError> {
        map.map(|m| sanitize_metadata(self.engine(), m, &self.limits)).transpose()
    }
}

/// Distinct raw ids can sanitize to the same text; later siblings lose theirs.
fn drop_repeated_ids<'a>(ids: impl IntoIterator<Item = &'a mut Option<String>>) {
    let mut seen = HashSet::new();
    for id in ids {
        let repeated = id.as_deref().is_some_and(|value| !seen.insert(value.to_string()));
        if repeated {
            debug!("Dropping sibling id that collides after sanitization.");
            *id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::MarkupEngine;
    use serde_json::json;

    #[derive(Debug)]
    struct FaultyEngine;

    impl SanitizationEngine for FaultyEngine {
        fn name(&self) -> &'static str {
            "faulty"
        }

        fn sanitize_text(&self, value: &str, _max_chars: usize) -> Result<String, SanitizeError> {
            if value.contains("boom") {
                Err(SanitizeError::Engine {
                    engine: self.name().to_string(),
                    reason: "cannot classify value".to_string(),
                })
            } else {
                Ok(value.to_string())
            }
        }
    }

    fn card(value: serde_json::Value) -> Card {
        serde_json::from_value(value).unwrap()
    }

    fn sanitizer() -> CardSanitizer {
        CardSanitizer::new(Limits::default(), Arc::new(MarkupEngine::new()))
    }

    #[test]
    fn input_is_not_mutated() {
        let input = card(json!({ "title": "<b>x</b>", "sections": [] }));
        let before = input.clone();
        let _ = sanitizer().sanitize(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn field_link_and_email_rules() {
        let input = card(json!({
            "title": "t",
            "sections": [{
                "title": "s", "type": "info",
                "fields": [
                    { "label": "ok", "value": "v", "link": "https://example.com", "email": " Bob@Example.com " },
                    { "label": "bad", "value": 1, "link": "javascript:alert(1)", "email": "nope" }
                ]
            }]
        }));
        let out = sanitizer().sanitize(&input);
        let fields = &out.sections[0].fields;

        assert_eq!(fields[0].link.as_deref(), Some("https://example.com/"));
        assert_eq!(fields[0].email.as_deref(), Some("bob@example.com"));
        assert_eq!(fields[1].link, None);
        assert_eq!(fields[1].email, None);
        assert_eq!(fields[1].value, FieldValue::Number(1.into()));
    }

    #[test]
    fn action_url_rejects_mailto_and_email_recipients_are_filtered() {
        let input = card(json!({
            "title": "t",
            "actions": [
                { "label": "a", "type": "link", "url": "mailto:x@example.com" },
                { "label": "b", "type": "email", "emailConfig": {
                    "contact": { "name": "<Ann>", "email": "ANN@example.com", "role": "ops" },
                    "subject": "<s>",
                    "cc": ["ok@example.com", "broken"],
                    "bcc": "hidden@example.com"
                }}
            ]
        }));
        let out = sanitizer().sanitize(&input);

        assert_eq!(out.actions[0].kind, ActionKind::Link { url: None });
        let ActionKind::Email { email_config: Some(config) } = &out.actions[1].kind else {
            panic!("expected email action");
        };
        let contact = config.contact.as_ref().unwrap();
        assert_eq!(contact.name.as_deref(), Some("&lt;Ann&gt;"));
        assert_eq!(contact.email.as_deref(), Some("ann@example.com"));
        assert_eq!(config.subject.as_deref(), Some("&lt;s&gt;"));
        assert_eq!(config.cc, vec!["ok@example.com".to_string()]);
        assert_eq!(config.bcc, vec!["hidden@example.com".to_string()]);
    }

    #[test]
    fn item_values_follow_field_rules() {
        let input = card(json!({
            "title": "t",
            "sections": [{
                "title": "s", "type": "list",
                "items": [
                    { "title": "<i>", "value": "<b>v</b>" },
                    { "title": "n", "value": { "note": "<x>", "id": "keep-for-now" } }
                ]
            }]
        }));
        let out = sanitizer().sanitize(&input);
        let items = &out.sections[0].items;

        assert_eq!(items[0].title, "&lt;i&gt;");
        assert_eq!(items[0].value, Some(FieldValue::Text("&lt;b&gt;v&lt;/b&gt;".into())));
        let Some(FieldValue::Object(map)) = &items[1].value else {
            panic!("expected object value");
        };
        assert_eq!(map["note"], json!("&lt;x&gt;"));
    }

    #[test]
    fn sibling_ids_that_collide_after_sanitization_are_dropped() {
        let long = "s".repeat(200);
        let input = card(json!({
            "title": "t",
            "sections": [
                { "id": "sec\u{1}", "title": "a", "type": "info",
                  "fields": [
                      { "id": format!("{long}-1"), "label": "x", "value": 1 },
                      { "id": format!("{long}-2"), "label": "y", "value": 2 }
                  ] },
                { "id": "sec", "title": "b", "type": "info" }
            ]
        }));
        let out = sanitizer().sanitize(&input);

        assert_eq!(out.sections[0].id.as_deref(), Some("sec"));
        assert_eq!(out.sections[1].id, None);
        assert_eq!(out.sections[0].fields[0].id.as_deref().map(str::len), Some(128));
        assert_eq!(out.sections[0].fields[1].id, None);
    }

    #[test]
    fn engine_fault_fails_closed() {
        let input = card(json!({
            "title": "fine",
            "sections": [{ "title": "boom", "type": "info" }]
        }));
        let sanitizer = CardSanitizer::new(Limits::default(), Arc::new(FaultyEngine));

        assert!(sanitizer.try_sanitize(&input).is_err());
        let out = sanitizer.sanitize(&input);
        assert!(out.is_empty());
        assert_ne!(out, input);
    }

    #[test]
    fn unvalidated_oversized_card_fails_closed() {
        let sections: Vec<_> = (0..25).map(|i| json!({ "title": format!("s{i}"), "type": "info" })).collect();
        let input = card(json!({ "title": "big", "sections": sections }));

        let err = sanitizer().try_sanitize(&input).unwrap_err();
        assert!(matches!(err, SanitizeError::CeilingExceeded(StructureViolation::TooManySections { .. })));
        assert!(sanitizer().sanitize(&input).is_empty());
    }

    #[test]
    fn blank_ids_are_dropped() {
        let input = card(json!({ "id": "\u{1}", "title": "t" }));
        assert_eq!(sanitizer().sanitize(&input).id, None);
    }
}
