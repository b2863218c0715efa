//! identity.rs - Assigns and strips per-node identity.
//!
//! Every card gets one random, time-ordered root id (`card-<uuid v7>`).
//! Nested nodes derive their ids from that root and their position:
//!
//! - `<card>:section-<s>`
//! - `<card>:field-<s>-<f>`
//! - `<card>:item-<s>-<i>`
//! - `<card>:action-<a>`
//!
//! Scoping nested ids by the root keeps them unique when subtrees from
//! different cards are merged. Existing non-empty ids are never replaced.
//!
//! License: MIT OR APACHE 2.0

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use uuid::Uuid;

use serde_json::Value;

use crate::errors::CardShieldError;
use crate::model::{Card, FieldValue, Metadata};

const ID_KEY: &str = "id";

/// Hands out ids that are unique among one set of siblings.
struct SiblingIds {
    taken: HashSet<String>,
    claimed: HashSet<String>,
}

impl SiblingIds {
    fn new<'a>(existing: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let taken = existing
            .into_iter()
            .flatten()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            taken,
            claimed: HashSet::new(),
        }
    }

    /// Keeps a non-empty `existing` id unless an earlier sibling already holds
    /// it; otherwise claims `generated` (suffixed on collision).
    fn assign(&mut self, existing: Option<&str>, generated: String) -> String {
        if let Some(id) = existing.filter(|id| !id.is_empty()) {
            if self.claimed.insert(id.to_string()) {
                return id.to_string();
            }
        }
        let mut candidate = generated.clone();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{generated}-{n}");
            n += 1;
        }
        self.taken.insert(candidate.clone());
        self.claimed.insert(candidate.clone());
        candidate
    }
}

pub fn generate_card_id() -> String {
    format!("card-{}", Uuid::now_v7())
}

/// Returns a copy of `card` in which every node carries an id.
///
/// `id` keys inside metadata and object-valued fields are removed so they
/// cannot be mistaken for node identity.
pub fn ensure_ids(card: &Card) -> Card {
    let mut out = card.clone();
    let card_id = match out.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_card_id(),
    };

    let mut section_ids = SiblingIds::new(out.sections.iter().map(|s| s.id.as_deref()));
    for (s, section) in out.sections.iter_mut().enumerate() {
        section.id = Some(section_ids.assign(section.id.as_deref(), format!("{card_id}:section-{s}")));
        section.metadata = section.metadata.as_ref().map(strip_metadata_ids);

        let mut field_ids = SiblingIds::new(section.fields.iter().map(|f| f.id.as_deref()));
        for (f, field) in section.fields.iter_mut().enumerate() {
            field.id = Some(field_ids.assign(field.id.as_deref(), format!("{card_id}:field-{s}-{f}")));
            field.value = strip_value_ids(&field.value);
            field.metadata = field.metadata.as_ref().map(strip_metadata_ids);
        }

        let mut item_ids = SiblingIds::new(section.items.iter().map(|i| i.id.as_deref()));
        for (i, item) in section.items.iter_mut().enumerate() {
            item.id = Some(item_ids.assign(item.id.as_deref(), format!("{card_id}:item-{s}-{i}")));
            item.value = item.value.as_ref().map(strip_value_ids);
            item.metadata = item.metadata.as_ref().map(strip_metadata_ids);
        }
    }

    let mut action_ids = SiblingIds::new(out.actions.iter().map(|a| a.id.as_deref()));
    for (a, action) in out.actions.iter_mut().enumerate() {
        action.id = Some(action_ids.assign(action.id.as_deref(), format!("{card_id}:action-{a}")));
        action.metadata = action.metadata.as_ref().map(strip_metadata_ids);
    }

    out.metadata = out.metadata.as_ref().map(strip_metadata_ids);
    out.id = Some(card_id);
    out
}

/// Deep copy of `value` without any key named `id`, at any depth.
pub fn strip_ids(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_metadata_ids(map)),
        Value::Array(items) => Value::Array(items.iter().map(strip_ids).collect()),
        other => other.clone(),
    }
}

fn strip_metadata_ids(map: &Metadata) -> Metadata {
    map.iter()
        .filter(|(key, _)| key.as_str() != ID_KEY)
        .map(|(key, value)| (key.clone(), strip_ids(value)))
        .collect()
}

fn strip_value_ids(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Object(map) => FieldValue::Object(strip_metadata_ids(map)),
        other => other.clone(),
    }
}

/// Typed counterpart of [`strip_ids`]: clears every node id and every nested `id` key.
pub fn strip_card_ids(card: &Card) -> Card {
    let mut out = card.clone();
    out.id = None;
    out.metadata = out.metadata.as_ref().map(strip_metadata_ids);
    for section in &mut out.sections {
        section.id = None;
        section.metadata = section.metadata.as_ref().map(strip_metadata_ids);
        for field in &mut section.fields {
            field.id = None;
            field.value = strip_value_ids(&field.value);
            field.metadata = field.metadata.as_ref().map(strip_metadata_ids);
        }
        for item in &mut section.items {
            item.id = None;
            item.value = item.value.as_ref().map(strip_value_ids);
            item.metadata = item.metadata.as_ref().map(strip_metadata_ids);
        }
    }
    for action in &mut out.actions {
        action.id = None;
        action.metadata = action.metadata.as_ref().map(strip_metadata_ids);
    }
    out
}

/// SHA-256 (hex) of the id-free JSON form of `card`.
///
/// Two cards that differ only in identity share a fingerprint.
pub fn fingerprint(card: &Card) -> Result<String, CardShieldError> {
    let value = strip_ids(&serde_json::to_value(card)?);
    let canonical = serde_json::to_vec(&value)?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
