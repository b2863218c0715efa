//! primitives.rs - Pure sanitizers for a single text, URL or email value.
//!
//! Text passes through four steps: control-character removal, dangerous
//! scheme removal, markup escaping and entity-aware truncation. Each step is
//! a fixpoint on its own output, so sanitizing twice gives the same result as
//! sanitizing once.
//!
//! License: MIT OR APACHE 2.0

use email_address::EmailAddress;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use url::Url;

/// Script-capable schemes removed wherever they appear in free text.
static DANGEROUS_TEXT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:java|vb|live)script\s*:").unwrap());

/// A complete character or entity reference at the start of the input.
static ENTITY_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});").unwrap());

/// Schemes that are never accepted, whatever the caller allows.
pub const DANGEROUS_URL_SCHEMES: [&str; 5] = ["javascript", "data", "vbscript", "file", "about"];

/// Schemes accepted for `Field.link`.
pub const LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Schemes accepted for `Action.url`.
pub const WEB_SCHEMES: [&str; 2] = ["http", "https"];

pub const MAX_EMAIL_LENGTH: usize = 254;

/// Removes control characters other than tab, newline and carriage return.
pub fn strip_control_chars(value: &str) -> Cow<'_, str> {
    let is_stripped = |c: char| c.is_control() && !matches!(c, '\t' | '\n' | '\r');
    if value.chars().any(is_stripped) {
        Cow::Owned(value.chars().filter(|c| !is_stripped(*c)).collect())
    } else {
        Cow::Borrowed(value)
    }
}

/// Removes `javascript:`-style sequences until none remain.
///
/// Removal repeats so that fragments such as `javajavascript:script:` cannot
/// reassemble into a live scheme. Every pass shortens the string.
pub fn strip_dangerous_schemes(value: &str) -> Cow<'_, str> {
    if !DANGEROUS_TEXT_SCHEME.is_match(value) {
        return Cow::Borrowed(value);
    }
    let mut current = value.to_string();
    while DANGEROUS_TEXT_SCHEME.is_match(&current) {
        current = DANGEROUS_TEXT_SCHEME.replace_all(&current, "").into_owned();
    }
    Cow::Owned(current)
}

/// Escapes `& < > " '` for HTML text and attribute contexts.
///
/// An `&` that already starts a complete entity reference is kept as is,
/// which makes the escape idempotent.
pub fn escape_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (idx, c) in value.char_indices() {
        match c {
            '&' if ENTITY_REFERENCE.is_match(&value[idx..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncates escaped text to `max_chars` without leaving half an entity behind.
pub fn truncate_escaped(value: &str, max_chars: usize) -> String {
    let Some((cut_at, _)) = value.char_indices().nth(max_chars) else {
        return value.to_string();
    };
    let mut cut = &value[..cut_at];
    // In escaped text every '&' opens an entity.
    if let Some(amp) = cut.rfind('&') {
        if !cut[amp..].contains(';') {
            cut = &cut[..amp];
        }
    }
    cut.to_string()
}

/// Full text rule: strip controls, strip dangerous schemes, escape, truncate.
pub fn sanitize_text(value: &str, max_chars: usize) -> String {
    let without_controls = strip_control_chars(value);
    let without_schemes = strip_dangerous_schemes(&without_controls);
    truncate_escaped(&escape_markup(&without_schemes), max_chars)
}

/// Accepts an absolute URL whose scheme is in `allowed_schemes`.
///
/// Returns the normalized serialization, or `None` when the value does not
/// parse, uses a dangerous or unlisted scheme, lacks a host for web schemes,
/// is longer than `max_len`, or would carry markup characters.
pub fn sanitize_url(value: &str, allowed_schemes: &[&str], max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > max_len {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => {
            debug!("Dropping unparseable URL: {}", e);
            return None;
        }
    };

    let scheme = parsed.scheme();
    if DANGEROUS_URL_SCHEMES.contains(&scheme) {
        debug!("Dropping URL with dangerous scheme '{}'", scheme);
        return None;
    }
    if !allowed_schemes.contains(&scheme) {
        debug!("Dropping URL with disallowed scheme '{}'", scheme);
        return None;
    }
    if matches!(scheme, "http" | "https") && parsed.host_str().is_none() {
        return None;
    }

    // The url crate leaves apostrophes in paths alone; encode them for attribute contexts.
    let normalized = parsed.to_string().replace('\'', "%27");
    if normalized.len() > max_len
        || normalized.contains(['<', '>', '"', '`'])
        || DANGEROUS_TEXT_SCHEME.is_match(&normalized)
    {
        return None;
    }
    Some(normalized)
}

/// Validates an email address and normalizes it to trimmed lowercase.
pub fn sanitize_email(value: &str) -> Option<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() || normalized.len() > MAX_EMAIL_LENGTH {
        return None;
    }
    // Quoted local parts are valid RFC 5322 but can smuggle markup.
    if normalized
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '\'' | '&' | '`' | '\\'))
    {
        return None;
    }

    let address = EmailAddress::parse_with_options(&normalized, Default::default()).ok()?;
    if !address.domain().contains('.') {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_script_tags() {
        let out = sanitize_text("<script>alert('XSS')</script>", 1000);
        assert_eq!(out, "&lt;script&gt;alert(&#x27;XSS&#x27;)&lt;/script&gt;");
    }

    #[test]
    fn escape_does_not_double_encode_entities() {
        let once = escape_markup("Tom & Jerry <3");
        assert_eq!(once, "Tom &amp; Jerry &lt;3");
        assert_eq!(escape_markup(&once), once);
    }

    #[test]
    fn bare_ampersand_sequences_are_escaped() {
        assert_eq!(escape_markup("&lt"), "&amp;lt");
        assert_eq!(escape_markup("a&b;"), "a&amp;b;");
    }

    #[test]
    fn removes_nested_javascript_schemes() {
        let out = strip_dangerous_schemes("click javajavascript:script:alert(1)");
        assert!(!out.to_lowercase().contains("javascript:"));
        assert_eq!(strip_dangerous_schemes("VBScript :x"), "x");
    }

    #[test]
    fn control_characters_cannot_hide_a_scheme() {
        let out = sanitize_text("java\u{0}script:alert(1)", 100);
        assert!(!out.contains("javascript:"));
    }

    #[test]
    fn keeps_newlines_and_tabs() {
        assert_eq!(strip_control_chars("a\tb\nc\u{7}"), "a\tb\nc");
    }

    #[test]
    fn truncation_never_splits_an_entity() {
        let escaped = escape_markup("ab<cd");
        assert_eq!(escaped, "ab&lt;cd");
        assert_eq!(truncate_escaped(&escaped, 4), "ab");
        assert_eq!(truncate_escaped(&escaped, 6), "ab&lt;");
        assert_eq!(truncate_escaped(&escaped, 100), escaped);
    }

    #[test]
    fn sanitize_text_respects_cap_on_long_input() {
        let input = "<b>".repeat(400);
        let out = sanitize_text(&input, 120);
        assert!(out.chars().count() <= 120);
        assert_eq!(sanitize_text(&out, 120), out);
    }

    #[test]
    fn url_allows_web_and_mailto_links() {
        assert_eq!(
            sanitize_url("https://example.com/a?b=c", &LINK_SCHEMES, 2048).as_deref(),
            Some("https://example.com/a?b=c")
        );
        assert!(sanitize_url("mailto:team@example.com", &LINK_SCHEMES, 2048).is_some());
        assert!(sanitize_url("mailto:team@example.com", &WEB_SCHEMES, 2048).is_none());
    }

    #[test]
    fn url_rejects_dangerous_and_unparseable_values() {
        for bad in [
            "javascript:alert(1)",
            "JaVaScRiPt:alert(1)",
            " \tjavascript:alert(1)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "vbscript:msgbox(1)",
            "file:///etc/passwd",
            "about:blank",
            "not a url",
            "/relative/path",
            "",
        ] {
            assert!(sanitize_url(bad, &LINK_SCHEMES, 2048).is_none(), "accepted {bad:?}");
        }
    }

    #[test]
    fn url_rejects_embedded_script_scheme_and_overlong_values() {
        assert!(sanitize_url("https://example.com/?next=javascript:alert(1)", &WEB_SCHEMES, 2048).is_none());
        let long = format!("https://example.com/{}", "a".repeat(100));
        assert!(sanitize_url(&long, &WEB_SCHEMES, 50).is_none());
    }

    #[test]
    fn url_percent_encodes_markup_in_web_urls() {
        let out = sanitize_url("https://example.com/<script>", &WEB_SCHEMES, 2048).unwrap();
        assert!(!out.contains('<'));
        assert_eq!(sanitize_url(&out, &WEB_SCHEMES, 2048), Some(out.clone()));
    }

    #[test]
    fn url_apostrophes_are_percent_encoded() {
        let out = sanitize_url("https://example.com/it's?q=o'neil", &WEB_SCHEMES, 2048);
        assert_eq!(out.as_deref(), Some("https://example.com/it%27s?q=o%27neil"));
        assert_eq!(sanitize_url(out.as_deref().unwrap(), &WEB_SCHEMES, 2048), out);
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(sanitize_email("  Alice@Example.COM ").as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn email_rejects_invalid_and_markup_bearing_addresses() {
        for bad in ["not-an-email", "a@b", "\"<script>\"@example.com", "a b@example.com", ""] {
            assert!(sanitize_email(bad).is_none(), "accepted {bad:?}");
        }
    }
}
