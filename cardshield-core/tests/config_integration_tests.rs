// cardshield-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use cardshield_core::config::{merge_config, ConfigOverride, Limits, ShieldConfig};
use cardshield_core::EngineKind;

#[test]
fn test_load_default_config() {
    let config = ShieldConfig::load_default().unwrap();
    assert_eq!(config.engine, EngineKind::Markup);
    assert_eq!(config.limits.max_payload_bytes, 1024 * 1024);
    assert_eq!(config.limits.max_sections, 20);
    assert_eq!(config.limits.lengths.card_title, 200);
    assert_eq!(config.limits.lengths.email_body, 5000);
}

#[test]
fn test_load_from_file_fills_missing_keys() -> Result<()> {
    let yaml_content = r#"
engine: strip-tags
limits:
  max_sections: 5
  lengths:
    card_title: 40
"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml_content.as_bytes())?;
    let config = ShieldConfig::load_from_file(file.path())?;

    assert_eq!(config.engine, EngineKind::StripTags);
    assert_eq!(config.limits.max_sections, 5);
    assert_eq!(config.limits.lengths.card_title, 40);
    // Untouched values keep their defaults.
    assert_eq!(config.limits.max_actions, Limits::default().max_actions);
    assert_eq!(config.limits.lengths.section_title, 100);
    Ok(())
}

#[test]
fn test_load_from_file_rejects_zero_limit() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"limits:\n  max_actions: 0\n")?;
    let err = ShieldConfig::load_from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("max_actions"));
    Ok(())
}

#[test]
fn test_load_from_missing_file_has_context() {
    let err = ShieldConfig::load_from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_merge_config_no_user_config() -> Result<()> {
    let merged = merge_config(ShieldConfig::default(), None)?;
    assert_eq!(merged, ShieldConfig::default());
    Ok(())
}

#[test]
fn test_merge_config_with_override_file() -> Result<()> {
    let yaml_content = r#"
engine: strip-tags
limits:
  max_payload_bytes: 4096
  lengths:
    field_value: 10
    not_a_cap: 3
"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml_content.as_bytes())?;
    let user = ConfigOverride::load_from_file(file.path())?;
    let merged = merge_config(ShieldConfig::load_default()?, Some(user))?;

    assert_eq!(merged.engine, EngineKind::StripTags);
    assert_eq!(merged.limits.max_payload_bytes, 4096);
    assert_eq!(merged.limits.lengths.field_value, 10);
    assert_eq!(merged.limits.max_sections, 20);
    Ok(())
}

#[test]
fn test_merge_config_rejects_zero_override() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"limits:\n  lengths:\n    card_title: 0\n")?;
    let user = ConfigOverride::load_from_file(file.path())?;
    assert!(merge_config(ShieldConfig::default(), Some(user)).is_err());
    Ok(())
}

#[test]
fn test_unknown_engine_is_a_parse_error() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"engine: regex\n")?;
    let err = ShieldConfig::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    Ok(())
}
