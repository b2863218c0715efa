// cardshield-core/src/diagnostics.rs
//! Diagnostic records describing why a payload was rejected or repaired,
//! and helpers that keep untrusted payload text out of debug logs.

use log::debug;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::sanitizers::primitives;

/// Set `CARDSHIELD_ALLOW_DEBUG_PAYLOAD=true` to see escaped payload previews in debug logs.
static PAYLOAD_DEBUG_ALLOWED: Lazy<bool> = Lazy::new(|| {
    std::env::var("CARDSHIELD_ALLOW_DEBUG_PAYLOAD")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

/// One rewrite applied by the best-effort repair pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Repair {
    /// The alternate `name` key was moved to `title` at `path`.
    RenamedTitleKey { path: String },
    /// A missing or null `sections` collection was replaced by `[]`.
    DefaultedSections,
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::RenamedTitleKey { path } => write!(f, "renamed 'name' to 'title' at {}", path),
            Repair::DefaultedSections => write!(f, "defaulted missing 'sections' to []"),
        }
    }
}

/// Snapshot of a payload that failed the card shape check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeDiagnostic {
    pub has_title: bool,
    pub has_sections: bool,
    /// JSON type of the `sections` entry, or `"missing"`.
    pub sections_type: String,
    /// Top-level keys, escaped.
    pub keys: Vec<String>,
    /// Escaped, truncated start of the raw payload.
    pub preview: String,
    /// Repairs attempted before the final check.
    pub repairs: Vec<Repair>,
}

impl ShapeDiagnostic {
    pub fn from_value(value: &Value, raw: &str, repairs: Vec<Repair>, preview_len: usize) -> Self {
        let object = value.as_object();
        let has_title = object
            .map(|o| o.get("title").is_some_and(Value::is_string) || o.get("name").is_some_and(Value::is_string))
            .unwrap_or(false);
        let sections = object.and_then(|o| o.get("sections"));
        let keys = object
            .map(|o| o.keys().map(|k| primitives::sanitize_text(k, preview_len)).collect())
            .unwrap_or_default();

        Self {
            has_title,
            has_sections: sections.is_some_and(Value::is_array),
            sections_type: sections.map_or("missing", json_type_name).to_string(),
            keys,
            preview: preview(raw, preview_len),
            repairs,
        }
    }
}

impl fmt::Display for ShapeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "has_title={}, has_sections={}, sections_type={}, keys=[{}]",
            self.has_title,
            self.has_sections,
            self.sections_type,
            self.keys.join(", ")
        )?;
        if !self.repairs.is_empty() {
            write!(f, ", repairs attempted={}", self.repairs.len())?;
        }
        Ok(())
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Escaped and truncated start of an untrusted payload, safe to return to callers.
pub fn preview(raw: &str, max_chars: usize) -> String {
    let head: String = raw.chars().take(max_chars).collect();
    primitives::sanitize_text(&head, max_chars)
}

pub fn redact_payload(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.chars().count())
    }
}

fn loggable(preview: &str) -> String {
    if *PAYLOAD_DEBUG_ALLOWED {
        preview.to_string()
    } else {
        redact_payload(preview)
    }
}

pub fn log_rejected_payload_debug(module_path: &str, reason: &str, preview: &str) {
    debug!("{} Rejected payload ({}): '{}'", module_path, reason, loggable(preview));
}
