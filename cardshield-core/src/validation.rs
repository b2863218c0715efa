//! validation.rs - Structural validation of untrusted card payloads.
//!
//! This module turns raw text into a typed [`Card`] or a [`ValidationError`].
//! It bounds the payload size before parsing, checks the parsed value's shape
//! with lenient predicates, applies a single best-effort repair pass and
//! enforces the collection ceilings before anything is handed to the
//! sanitizer. Nothing here panics; every rejection is a returned error plus a
//! logged warning.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::config::Limits;
use crate::diagnostics::{self, log_rejected_payload_debug, Repair, ShapeDiagnostic};
use crate::errors::{StructureViolation, ValidationError};
use crate::model::{Card, SectionKind};
use crate::sanitizers::primitives::sanitize_text;

const ACTION_TAGS: [&str; 4] = ["link", "email", "copy", "callback"];

/// A card that passed validation, with the repairs needed to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCard {
    pub card: Card,
    pub repairs: Vec<Repair>,
}

impl ParsedCard {
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

fn non_blank_str(object: &Map<String, Value>, key: &str) -> bool {
    object
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// Accepts `title`, or the alternate `name` key, as a non-blank string.
fn has_title(object: &Map<String, Value>) -> bool {
    non_blank_str(object, "title") || non_blank_str(object, "name")
}

/// An absent collection is fine; a present one must be an array of valid entries.
fn optional_list(object: &Map<String, Value>, key: &str, each: fn(&Value) -> bool) -> bool {
    match object.get(key) {
        None => true,
        Some(Value::Array(entries)) => entries.iter().all(each),
        Some(_) => false,
    }
}

fn is_value_shape(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Object(_)
    )
}

/// Shape predicate for a whole card payload.
pub fn is_valid_card(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    has_title(object)
        && optional_list(object, "sections", is_valid_section)
        && optional_list(object, "actions", is_valid_action)
}

/// Shape predicate for a section: title, known `type` tag, well-formed children.
pub fn is_valid_section(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let known_kind = object
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|tag| SectionKind::from_tag(tag).is_some());

    has_title(object)
        && known_kind
        && optional_list(object, "fields", is_valid_field)
        && optional_list(object, "items", is_valid_item)
}

/// Shape predicate for a field: a label or title, and a scalar or object value.
pub fn is_valid_field(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let labelled = non_blank_str(object, "label") || non_blank_str(object, "title");
    labelled && object.get("value").is_some_and(is_value_shape)
}

pub fn is_valid_item(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    has_title(object) && object.get("value").is_none_or(is_value_shape)
}

pub fn is_valid_action(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let known_kind = object
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|tag| ACTION_TAGS.contains(&tag));
    non_blank_str(object, "label") && known_kind
}

/// Moves `name` to `title` when `title` is absent.
fn rename_title_key(object: &mut Map<String, Value>, path: String, repairs: &mut Vec<Repair>) {
    if object.contains_key("title") {
        return;
    }
    if let Some(name) = object.remove("name") {
        object.insert("title".to_string(), name);
        repairs.push(Repair::RenamedTitleKey { path });
    }
}

/// The single repair pass. Returns a rewritten copy and the rules that fired.
fn repair(value: &Value) -> (Value, Vec<Repair>) {
    let mut repaired = value.clone();
    let mut repairs = Vec::new();

    if let Some(card) = repaired.as_object_mut() {
        rename_title_key(card, "card".to_string(), &mut repairs);

        if card.get("sections").is_none_or(Value::is_null) {
            card.insert("sections".to_string(), Value::Array(Vec::new()));
            repairs.push(Repair::DefaultedSections);
        }

        if let Some(Value::Array(sections)) = card.get_mut("sections") {
            for (s, section) in sections.iter_mut().enumerate() {
                let Some(section) = section.as_object_mut() else {
                    continue;
                };
                rename_title_key(section, format!("sections[{s}]"), &mut repairs);
                if let Some(Value::Array(items)) = section.get_mut("items") {
                    for (i, item) in items.iter_mut().enumerate() {
                        if let Some(item) = item.as_object_mut() {
                            rename_title_key(item, format!("sections[{s}].items[{i}]"), &mut repairs);
                        }
                    }
                }
            }
        }
    }

    (repaired, repairs)
}

fn array_len(object: &Map<String, Value>, key: &str) -> usize {
    object.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

/// Count ceilings over an untyped value, before it is converted.
fn check_value_ceilings(value: &Value, limits: &Limits) -> Result<(), StructureViolation> {
    let Some(card) = value.as_object() else {
        return Ok(());
    };
    let sections = array_len(card, "sections");
    if sections > limits.max_sections {
        return Err(StructureViolation::TooManySections {
            count: sections,
            limit: limits.max_sections,
        });
    }
    let actions = array_len(card, "actions");
    if actions > limits.max_actions {
        return Err(StructureViolation::TooManyActions {
            count: actions,
            limit: limits.max_actions,
        });
    }
    let section_objects = card
        .get("sections")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object);
    for (index, section) in section_objects.enumerate() {
        let fields = array_len(section, "fields");
        if fields > limits.max_fields_per_section {
            return Err(StructureViolation::TooManyFields {
                section: index,
                count: fields,
                limit: limits.max_fields_per_section,
            });
        }
        let items = array_len(section, "items");
        if items > limits.max_items_per_section {
            return Err(StructureViolation::TooManyItems {
                section: index,
                count: items,
                limit: limits.max_items_per_section,
            });
        }
    }
    Ok(())
}

/// Applies the collection ceilings to a parsed but unconverted payload.
pub fn validate_structure_value(value: &Value, limits: &Limits) -> bool {
    match check_value_ceilings(value, limits) {
        Ok(()) => true,
        Err(violation) => {
            warn!("Payload exceeds structure ceilings: {}", violation);
            false
        }
    }
}

/// serde messages quote the offending input, so they get the preview treatment.
fn safe_message(e: &serde_json::Error, limits: &Limits) -> String {
    sanitize_text(&e.to_string(), limits.lengths.preview)
}

fn reject(raw: &str, limits: &Limits, error: ValidationError) -> ValidationError {
    warn!("Rejected card payload: {}", error);
    let preview = diagnostics::preview(raw, limits.lengths.preview);
    log_rejected_payload_debug(module_path!(), &error.to_string(), &preview);
    error
}

/// Parses, shape-checks, repairs and converts one raw payload.
///
/// The byte ceiling is enforced before the parser sees the input, and the
/// collection ceilings before the value is converted into a typed card.
pub fn parse_and_validate(raw: &str, limits: &Limits) -> Result<ParsedCard, ValidationError> {
    if raw.trim().is_empty() {
        return Err(reject(raw, limits, ValidationError::Empty));
    }
    if raw.len() > limits.max_payload_bytes {
        // No preview: the payload is never looked at beyond its length.
        let error = ValidationError::Oversize {
            size: raw.len(),
            limit: limits.max_payload_bytes,
        };
        warn!("Rejected card payload: {}", error);
        return Err(error);
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        reject(
            raw,
            limits,
            ValidationError::Parse {
                message: safe_message(&e, limits),
                line: e.line(),
                column: e.column(),
            },
        )
    })?;

    let valid_before_repair = is_valid_card(&value);
    let (value, repairs) = repair(&value);
    if !valid_before_repair && !is_valid_card(&value) {
        let diagnostic = ShapeDiagnostic::from_value(&value, raw, repairs, limits.lengths.preview);
        return Err(reject(raw, limits, ValidationError::Shape(diagnostic)));
    }
    for applied in &repairs {
        debug!("Repaired card payload: {}", applied);
    }

    check_value_ceilings(&value, limits).map_err(|v| reject(raw, limits, ValidationError::Structure(v)))?;

    let card: Card = serde_json::from_value(value)
        .map_err(|e| reject(raw, limits, ValidationError::Conversion(safe_message(&e, limits))))?;

    Ok(ParsedCard { card, repairs })
}

/// Deep check of a typed card: blank titles, missing labels and count ceilings.
///
/// Returns the first violation found, walking sections before actions.
pub fn check_structure(card: &Card, limits: &Limits) -> Result<(), StructureViolation> {
    if card.sections.len() > limits.max_sections {
        return Err(StructureViolation::TooManySections {
            count: card.sections.len(),
            limit: limits.max_sections,
        });
    }
    if card.actions.len() > limits.max_actions {
        return Err(StructureViolation::TooManyActions {
            count: card.actions.len(),
            limit: limits.max_actions,
        });
    }
    if card.title.trim().is_empty() {
        return Err(StructureViolation::BlankTitle {
            path: "card".to_string(),
        });
    }

    for (s, section) in card.sections.iter().enumerate() {
        if section.fields.len() > limits.max_fields_per_section {
            return Err(StructureViolation::TooManyFields {
                section: s,
                count: section.fields.len(),
                limit: limits.max_fields_per_section,
            });
        }
        if section.items.len() > limits.max_items_per_section {
            return Err(StructureViolation::TooManyItems {
                section: s,
                count: section.items.len(),
                limit: limits.max_items_per_section,
            });
        }
        if section.title.trim().is_empty() {
            return Err(StructureViolation::BlankTitle {
                path: format!("sections[{s}]"),
            });
        }
        for (f, field) in section.fields.iter().enumerate() {
            let labelled = [field.label.as_deref(), field.title.as_deref()]
                .into_iter()
                .flatten()
                .any(|s| !s.trim().is_empty());
            if !labelled {
                return Err(StructureViolation::MissingLabel {
                    path: format!("sections[{s}].fields[{f}]"),
                });
            }
        }
        for (i, item) in section.items.iter().enumerate() {
            if item.title.trim().is_empty() {
                return Err(StructureViolation::BlankTitle {
                    path: format!("sections[{s}].items[{i}]"),
                });
            }
        }
    }

    for (a, action) in card.actions.iter().enumerate() {
        if action.label.trim().is_empty() {
            return Err(StructureViolation::MissingLabel {
                path: format!("actions[{a}]"),
            });
        }
    }
    Ok(())
}

/// Boolean form of [`check_structure`]; a failure is logged as a warning.
pub fn validate_structure_deep(card: &Card, limits: &Limits) -> bool {
    match check_structure(card, limits) {
        Ok(()) => true,
        Err(violation) => {
            warn!("Card failed deep structure check: {}", violation);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn predicates_accept_alternate_title_key() {
        assert!(is_valid_card(&json!({ "name": "Legacy" })));
        assert!(is_valid_section(&json!({ "name": "S", "type": "info" })));
        assert!(is_valid_field(&json!({ "title": "t", "value": 1 })));
        assert!(!is_valid_field(&json!({ "label": "t" })));
        assert!(!is_valid_field(&json!({ "label": "t", "value": [1, 2] })));
    }

    #[test]
    fn wrong_typed_sections_are_not_tolerated() {
        assert!(!is_valid_card(&json!({ "title": "T", "sections": "oops" })));
        assert!(!is_valid_card(&json!({ "title": "T", "sections": [{ "title": "S", "type": "carousel" }] })));
    }

    #[test]
    fn empty_and_whitespace_input_is_rejected() {
        assert_eq!(parse_and_validate("", &limits()), Err(ValidationError::Empty));
        assert_eq!(parse_and_validate("  \n\t", &limits()), Err(ValidationError::Empty));
    }

    #[test]
    fn oversize_is_rejected_before_parsing() {
        let limits = Limits {
            max_payload_bytes: 16,
            ..Limits::default()
        };
        // Not JSON at all: an Oversize error proves the parser never ran.
        let raw = "x".repeat(17);
        assert_eq!(
            parse_and_validate(&raw, &limits),
            Err(ValidationError::Oversize { size: 17, limit: 16 })
        );
    }

    #[test]
    fn parse_errors_carry_position() {
        let err = parse_and_validate("{\n  \"title\": }", &limits()).unwrap_err();
        match err {
            ValidationError::Parse { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn repair_renames_and_defaults_and_is_reported() {
        let parsed = parse_and_validate(r#"{ "name": "Legacy card" }"#, &limits()).unwrap();
        assert_eq!(parsed.card.title, "Legacy card");
        assert!(parsed.card.sections.is_empty());
        assert!(parsed.was_repaired());
        assert_eq!(
            parsed.repairs,
            vec![
                Repair::RenamedTitleKey { path: "card".to_string() },
                Repair::DefaultedSections
            ]
        );
    }

    #[test]
    fn nested_title_keys_are_repaired() {
        let raw = r#"{ "title": "T", "sections": [{ "name": "S", "type": "list", "items": [{ "name": "I" }] }] }"#;
        let parsed = parse_and_validate(raw, &limits()).unwrap();
        assert_eq!(parsed.card.sections[0].title, "S");
        assert_eq!(parsed.card.sections[0].items[0].title, "I");
        assert_eq!(parsed.repairs.len(), 2);
    }

    #[test]
    fn unrepairable_shape_returns_diagnostic() {
        let err = parse_and_validate(r#"{ "sections": 5, "<k>": 1 }"#, &limits()).unwrap_err();
        let ValidationError::Shape(diagnostic) = err else {
            panic!("expected shape error");
        };
        assert!(!diagnostic.has_title);
        assert!(!diagnostic.has_sections);
        assert_eq!(diagnostic.sections_type, "number");
        assert!(diagnostic.keys.contains(&"&lt;k&gt;".to_string()));
        assert!(!diagnostic.preview.contains('<'));
    }

    #[test]
    fn non_object_payload_is_a_shape_error() {
        assert!(matches!(
            parse_and_validate("[1, 2, 3]", &limits()),
            Err(ValidationError::Shape(_))
        ));
    }

    #[test]
    fn conversion_errors_do_not_echo_raw_input() {
        let script = format!("<script>alert(document.cookie)</script>{}", "x".repeat(5000));
        let raw = json!({ "title": "T", "metadata": script }).to_string();

        let err = parse_and_validate(&raw, &limits()).unwrap_err();
        let ValidationError::Conversion(message) = &err else {
            panic!("unexpected error {err:?}");
        };
        assert!(!message.contains("<script>"));
        assert!(message.contains("&lt;script&gt;"));
        assert!(message.chars().count() <= limits().lengths.preview);
        assert!(!err.to_string().contains('<'));
    }

    #[test]
    fn ceilings_are_checked_before_conversion() {
        let sections: Vec<_> = (0..25).map(|i| json!({ "title": format!("S{i}"), "type": "info" })).collect();
        let raw = json!({ "title": "Big", "sections": sections }).to_string();

        assert!(!validate_structure_value(&serde_json::from_str(&raw).unwrap(), &limits()));
        assert_eq!(
            parse_and_validate(&raw, &limits()),
            Err(ValidationError::Structure(StructureViolation::TooManySections { count: 25, limit: 20 }))
        );
    }

    #[test]
    fn deep_check_rejects_blank_titles_and_labels() {
        let card: Card = serde_json::from_value(json!({
            "title": "T",
            "sections": [{ "title": "S", "type": "info", "fields": [{ "label": "  ", "value": "v" }] }]
        }))
        .unwrap();
        assert_eq!(
            check_structure(&card, &limits()),
            Err(StructureViolation::MissingLabel {
                path: "sections[0].fields[0]".to_string()
            })
        );
        assert!(!validate_structure_deep(&card, &limits()));
    }

    #[test]
    fn deep_check_enforces_count_ceiling() {
        let sections: Vec<_> = (0..25).map(|i| json!({ "title": format!("S{i}"), "type": "info" })).collect();
        let card: Card = serde_json::from_value(json!({ "title": "Big", "sections": sections })).unwrap();
        assert!(!validate_structure_deep(&card, &limits()));

        let fields: Vec<_> = (0..3).map(|i| json!({ "label": format!("f{i}"), "value": i })).collect();
        let card: Card = serde_json::from_value(json!({
            "title": "T",
            "sections": [{ "title": "S", "type": "info", "fields": fields }]
        }))
        .unwrap();
        let tight = Limits {
            max_fields_per_section: 2,
            ..Limits::default()
        };
        assert!(!validate_structure_deep(&card, &tight));
        assert!(validate_structure_deep(&card, &limits()));
    }
}
