//! Configuration management for `cardshield-core`.
//!
//! This module defines the ceilings the pipeline enforces (payload bytes,
//! collection counts, per-field string caps) and the choice of text engine.
//! It handles deserialization of YAML configurations and provides utilities
//! for loading, merging, and validating them.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::engines::EngineKind;

/// Per-field string caps, counted in Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LengthLimits {
    pub id: usize,
    pub card_title: usize,
    pub card_subtitle: usize,
    pub card_description: usize,
    pub card_type: usize,
    pub section_title: usize,
    pub section_subtitle: usize,
    pub section_description: usize,
    pub field_label: usize,
    pub field_description: usize,
    pub field_value: usize,
    pub item_title: usize,
    pub item_description: usize,
    pub action_label: usize,
    pub action_icon: usize,
    pub contact_name: usize,
    pub contact_role: usize,
    pub email_subject: usize,
    pub email_body: usize,
    pub metadata_key: usize,
    pub metadata_value: usize,
    pub preview: usize,
}

impl Default for LengthLimits {
    fn default() -> Self {
        Self {
            id: 128,
            card_title: 200,
            card_subtitle: 300,
            card_description: 1000,
            card_type: 50,
            section_title: 100,
            section_subtitle: 200,
            section_description: 500,
            field_label: 100,
            field_description: 500,
            field_value: 1000,
            item_title: 200,
            item_description: 500,
            action_label: 50,
            action_icon: 50,
            contact_name: 100,
            contact_role: 100,
            email_subject: 200,
            email_body: 5000,
            metadata_key: 100,
            metadata_value: 1000,
            preview: 200,
        }
    }
}

impl LengthLimits {
    /// Every cap paired with its configuration key.
    pub fn entries(&self) -> [(&'static str, usize); 22] {
        [
            ("id", self.id),
            ("card_title", self.card_title),
            ("card_subtitle", self.card_subtitle),
            ("card_description", self.card_description),
            ("card_type", self.card_type),
            ("section_title", self.section_title),
            ("section_subtitle", self.section_subtitle),
            ("section_description", self.section_description),
            ("field_label", self.field_label),
            ("field_description", self.field_description),
            ("field_value", self.field_value),
            ("item_title", self.item_title),
            ("item_description", self.item_description),
            ("action_label", self.action_label),
            ("action_icon", self.action_icon),
            ("contact_name", self.contact_name),
            ("contact_role", self.contact_role),
            ("email_subject", self.email_subject),
            ("email_body", self.email_body),
            ("metadata_key", self.metadata_key),
            ("metadata_value", self.metadata_value),
            ("preview", self.preview),
        ]
    }

    /// Sets a cap by its configuration key. Returns `false` for unknown keys.
    pub fn set(&mut self, name: &str, value: usize) -> bool {
        let slot = match name {
            "id" => &mut self.id,
            "card_title" => &mut self.card_title,
            "card_subtitle" => &mut self.card_subtitle,
            "card_description" => &mut self.card_description,
            "card_type" => &mut self.card_type,
            "section_title" => &mut self.section_title,
            "section_subtitle" => &mut self.section_subtitle,
            "section_description" => &mut self.section_description,
            "field_label" => &mut self.field_label,
            "field_description" => &mut self.field_description,
            "field_value" => &mut self.field_value,
            "item_title" => &mut self.item_title,
            "item_description" => &mut self.item_description,
            "action_label" => &mut self.action_label,
            "action_icon" => &mut self.action_icon,
            "contact_name" => &mut self.contact_name,
            "contact_role" => &mut self.contact_role,
            "email_subject" => &mut self.email_subject,
            "email_body" => &mut self.email_body,
            "metadata_key" => &mut self.metadata_key,
            "metadata_value" => &mut self.metadata_value,
            "preview" => &mut self.preview,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Size and count ceilings applied to every payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Raw payloads larger than this are rejected before parsing.
    pub max_payload_bytes: usize,
    /// Whole batch documents (a JSON array of payloads) larger than this are refused unread.
    pub max_batch_bytes: usize,
    pub max_sections: usize,
    pub max_fields_per_section: usize,
    pub max_items_per_section: usize,
    pub max_actions: usize,
    /// Deepest array/object nesting accepted inside `metadata` and object values.
    pub max_metadata_depth: usize,
    /// URLs longer than this are dropped rather than truncated.
    pub max_url_length: usize,
    pub lengths: LengthLimits,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024,
            max_batch_bytes: 64 * 1024 * 1024,
            max_sections: 20,
            max_fields_per_section: 50,
            max_items_per_section: 100,
            max_actions: 10,
            max_metadata_depth: 16,
            max_url_length: 2048,
            lengths: LengthLimits::default(),
        }
    }
}

impl Limits {
    /// Rejects ceilings that would make every payload invalid.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let ceilings = [
            ("max_payload_bytes", self.max_payload_bytes),
            ("max_batch_bytes", self.max_batch_bytes),
            ("max_sections", self.max_sections),
            ("max_fields_per_section", self.max_fields_per_section),
            ("max_items_per_section", self.max_items_per_section),
            ("max_actions", self.max_actions),
            ("max_metadata_depth", self.max_metadata_depth),
            ("max_url_length", self.max_url_length),
        ];
        for (name, value) in ceilings {
            if value == 0 {
                errors.push(format!("Limit '{}' must be greater than 0.", name));
            }
        }
        for (name, value) in self.lengths.entries() {
            if value == 0 {
                errors.push(format!("Length cap '{}' must be greater than 0.", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Limits validation failed:\n{}", errors.join("\n")))
        }
    }
}

/// Top-level configuration structure for CardShield.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Which text engine the recursive sanitizer uses.
    pub engine: EngineKind,
    pub limits: Limits,
}

/// Partial overrides read from a user file and layered over the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsOverride {
    pub max_payload_bytes: Option<usize>,
    pub max_batch_bytes: Option<usize>,
    pub max_sections: Option<usize>,
    pub max_fields_per_section: Option<usize>,
    pub max_items_per_section: Option<usize>,
    pub max_actions: Option<usize>,
    pub max_metadata_depth: Option<usize>,
    pub max_url_length: Option<usize>,
    pub lengths: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigOverride {
    pub engine: Option<EngineKind>,
    pub limits: LimitsOverride,
}

impl ShieldConfig {
    /// Loads the embedded default configuration.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default limits from embedded string...");
        let default_yaml = include_str!("../config/default_limits.yaml");
        let config: ShieldConfig =
            serde_yml::from_str(default_yaml).context("Failed to parse default limits")?;
        config.limits.validate()?;
        Ok(config)
    }

    /// Loads a complete configuration from a YAML file. Missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ShieldConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.limits.validate()?;
        Ok(config)
    }
}

impl ConfigOverride {
    /// Loads a partial override file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration overrides from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Layers user overrides on top of the default configuration.
///
/// Unknown length-cap names are reported and ignored. The merged result is
/// validated before it is returned.
pub fn merge_config(default_config: ShieldConfig, user_config: Option<ConfigOverride>) -> Result<ShieldConfig> {
    let mut merged = default_config;

    let Some(user) = user_config else {
        debug!("No user overrides provided; using defaults.");
        return Ok(merged);
    };

    if let Some(engine) = user.engine {
        debug!("Overriding engine with user value: {:?}", engine);
        merged.engine = engine;
    }

    let limits = &mut merged.limits;
    let overrides = user.limits;
    let ceilings = [
        (&mut limits.max_payload_bytes, overrides.max_payload_bytes, "max_payload_bytes"),
        (&mut limits.max_batch_bytes, overrides.max_batch_bytes, "max_batch_bytes"),
        (&mut limits.max_sections, overrides.max_sections, "max_sections"),
        (&mut limits.max_fields_per_section, overrides.max_fields_per_section, "max_fields_per_section"),
        (&mut limits.max_items_per_section, overrides.max_items_per_section, "max_items_per_section"),
        (&mut limits.max_actions, overrides.max_actions, "max_actions"),
        (&mut limits.max_metadata_depth, overrides.max_metadata_depth, "max_metadata_depth"),
        (&mut limits.max_url_length, overrides.max_url_length, "max_url_length"),
    ];
    for (slot, value, name) in ceilings {
        if let Some(value) = value {
            debug!("Overriding {} with user value: {}", name, value);
            *slot = value;
        }
    }

    for (name, value) in overrides.lengths {
        if !limits.lengths.set(&name, value) {
            warn!("Length cap '{}' in user configuration does not exist.", name);
        }
    }

    merged.limits.validate()?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_default_impl() {
        let loaded = ShieldConfig::load_default().unwrap();
        assert_eq!(loaded, ShieldConfig::default());
    }

    #[test]
    fn zero_ceiling_fails_validation() {
        let limits = Limits {
            max_sections: 0,
            ..Limits::default()
        };
        let err = limits.validate().unwrap_err().to_string();
        assert!(err.contains("max_sections"));
    }

    #[test]
    fn merge_applies_overrides_and_ignores_unknown_caps() {
        let mut lengths = BTreeMap::new();
        lengths.insert("card_title".to_string(), 40);
        lengths.insert("no_such_cap".to_string(), 7);
        let user = ConfigOverride {
            engine: Some(EngineKind::StripTags),
            limits: LimitsOverride {
                max_sections: Some(5),
                lengths,
                ..LimitsOverride::default()
            },
        };

        let merged = merge_config(ShieldConfig::default(), Some(user)).unwrap();
        assert_eq!(merged.engine, EngineKind::StripTags);
        assert_eq!(merged.limits.max_sections, 5);
        assert_eq!(merged.limits.lengths.card_title, 40);
        assert_eq!(merged.limits.max_fields_per_section, 50);
    }

    #[test]
    fn merge_rejects_zero_override() {
        let user = ConfigOverride {
            limits: LimitsOverride {
                max_payload_bytes: Some(0),
                ..LimitsOverride::default()
            },
            ..ConfigOverride::default()
        };
        assert!(merge_config(ShieldConfig::default(), Some(user)).is_err());
    }
}
