//! batch.rs - Operations over collections of card payloads.
//!
//! Each payload is validated and sanitized independently; a failure on one
//! never stops the rest of the batch. The cross-card reports (merge, dedup,
//! stats) are plain serializable structs so the CLI can print them as a
//! table or as JSON.
//!
//! License: MIT OR APACHE 2.0

use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::convert::Infallible;

use crate::config::Limits;
use crate::diagnostics;
use crate::errors::{CardShieldError, ValidationError};
use crate::identity::fingerprint;
use crate::model::Card;
use crate::pipeline::CardPipeline;
use crate::sanitizers::CardSanitizer;
use crate::validation::{check_structure, parse_and_validate};

/// Type bucket for cards without a `type`.
pub const UNKNOWN_TYPE: &str = "unknown";

/// One rejected payload of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidEntry {
    pub index: usize,
    pub error: String,
    /// Escaped, truncated start of the rejected payload.
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: Vec<Card>,
    pub invalid: Vec<InvalidEntry>,
    /// Percentage of payloads that validated; 0 for an empty batch.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub merged: Vec<Card>,
    pub duplicate_count: usize,
    /// Card id -> number of later occurrences that were discarded.
    pub duplicates: BTreeMap<String, usize>,
}

/// Cards that share a dedup key, by their position in the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub key: String,
    /// Title of the first card in the group.
    pub title: String,
    pub indices: Vec<usize>,
}

impl DuplicateGroup {
    pub fn size(&self) -> usize {
        self.indices.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub unique: Vec<Card>,
    pub duplicates: Vec<DuplicateGroup>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_cards: usize,
    pub by_type: BTreeMap<String, usize>,
    pub total_sections: usize,
    pub avg_sections_per_card: f64,
    pub cards_with_actions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionAnalysis {
    pub valid_cards: Vec<Card>,
    pub invalid_count: usize,
    pub invalid: Vec<InvalidEntry>,
    pub stats: CollectionStats,
    pub duplicates: Vec<DuplicateGroup>,
    pub issues: Vec<String>,
}

impl InvalidEntry {
    fn new(index: usize, raw: &str, error: &ValidationError, limits: &Limits) -> Self {
        Self {
            index,
            error: error.to_string(),
            preview: diagnostics::preview(raw, limits.lengths.preview),
        }
    }
}

fn validate_one(raw: &str, limits: &Limits) -> Result<Card, ValidationError> {
    let parsed = parse_and_validate(raw, limits)?;
    check_structure(&parsed.card, limits).map_err(ValidationError::Structure)?;
    Ok(parsed.card)
}

/// Validates every payload, partitioning them into valid cards and rejects.
pub fn validate_many<S: AsRef<str>>(raws: &[S], limits: &Limits) -> ValidationReport {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for (index, raw) in raws.iter().enumerate() {
        let raw = raw.as_ref();
        match validate_one(raw, limits) {
            Ok(card) => valid.push(card),
            Err(e) => invalid.push(InvalidEntry::new(index, raw, &e, limits)),
        }
    }

    let success_rate = if raws.is_empty() {
        0.0
    } else {
        valid.len() as f64 / raws.len() as f64 * 100.0
    };
    info!(
        "Validated {} payloads: {} valid, {} invalid.",
        raws.len(),
        valid.len(),
        invalid.len()
    );

    ValidationReport {
        valid,
        invalid,
        success_rate,
    }
}

/// Sanitizes each card, dropping any whose walk fails.
pub fn sanitize_many(cards: &[Card], sanitizer: &CardSanitizer) -> Vec<Card> {
    cards
        .iter()
        .enumerate()
        .filter_map(|(index, card)| match sanitizer.try_sanitize(card) {
            Ok(clean) => Some(clean),
            Err(e) => {
                warn!("Dropping card {} from batch: {}", index, e);
                None
            }
        })
        .collect()
}

/// Merges collections of identified cards by id; the first occurrence wins.
///
/// Cards without an id cannot collide and are always kept.
pub fn merge(collections: &[Vec<Card>]) -> MergeReport {
    let mut merged = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: BTreeMap<String, usize> = BTreeMap::new();

    for card in collections.iter().flatten() {
        match card.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if seen.contains(id) => {
                *duplicates.entry(id.to_string()).or_insert(0) += 1;
            }
            Some(id) => {
                seen.insert(id.to_string());
                merged.push(card.clone());
            }
            None => merged.push(card.clone()),
        }
    }

    MergeReport {
        duplicate_count: duplicates.values().sum(),
        merged,
        duplicates,
    }
}

/// Keeps the first card per key and reports every key shared by more than one card.
fn group_by<F, E>(cards: &[Card], key_of: F) -> Result<DedupReport, E>
where
    F: Fn(&Card) -> Result<String, E>,
{
    let mut unique = Vec::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, card) in cards.iter().enumerate() {
        let key = key_of(card)?;
        match by_key.get(&key) {
            Some(&group) => groups[group].indices.push(index),
            None => {
                by_key.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    title: card.title.clone(),
                    indices: vec![index],
                });
                unique.push(card.clone());
            }
        }
    }

    groups.retain(|group| group.size() > 1);
    Ok(DedupReport {
        unique,
        duplicates: groups,
    })
}

/// Groups cards by trimmed, lowercased title.
pub fn deduplicate_by_title(cards: &[Card]) -> DedupReport {
    match group_by::<_, Infallible>(cards, |card| Ok(card.title.trim().to_lowercase())) {
        Ok(report) => report,
        Err(never) => match never {},
    }
}

/// Groups cards whose id-free content is identical.
pub fn deduplicate_by_content(cards: &[Card]) -> Result<DedupReport, CardShieldError> {
    group_by(cards, fingerprint)
}

pub fn stats(cards: &[Card]) -> CollectionStats {
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for card in cards {
        let kind = card
            .kind
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(UNKNOWN_TYPE);
        *by_type.entry(kind.to_string()).or_insert(0) += 1;
    }

    let total_sections: usize = cards.iter().map(|c| c.sections.len()).sum();
    let avg_sections_per_card = if cards.is_empty() {
        0.0
    } else {
        total_sections as f64 / cards.len() as f64
    };

    CollectionStats {
        total_cards: cards.len(),
        by_type,
        total_sections,
        avg_sections_per_card,
        cards_with_actions: cards.iter().filter(|c| !c.actions.is_empty()).count(),
    }
}

fn collection_issues(invalid_count: usize, cards: &[Card], stats: &CollectionStats, dup_groups: usize) -> Vec<String> {
    let mut issues = Vec::new();
    if invalid_count > 0 {
        issues.push(format!("{} invalid cards found", invalid_count));
    }
    if dup_groups > 0 {
        issues.push(format!("{} duplicate title groups found", dup_groups));
    }
    let without_sections = cards.iter().filter(|c| c.sections.is_empty()).count();
    if without_sections > 0 {
        issues.push(format!("{} cards have no sections", without_sections));
    }
    if stats.total_cards > 0 && stats.cards_with_actions == 0 {
        issues.push("no cards have actions defined".to_string());
    }
    issues
}

/// Validates, sanitizes and identifies a batch, then reports on it as a whole.
pub fn analyze_collection<S: AsRef<str>>(raws: &[S], pipeline: &CardPipeline) -> CollectionAnalysis {
    let mut valid_cards = Vec::new();
    let mut invalid = Vec::new();

    for (index, raw) in raws.iter().enumerate() {
        let raw = raw.as_ref();
        match pipeline.process(raw) {
            Ok(processed) if processed.failed_closed => {
                warn!("Dropping card {} from batch: sanitization failed closed.", index);
            }
            Ok(processed) => valid_cards.push(processed.card),
            Err(e) => invalid.push(InvalidEntry::new(index, raw, &e, pipeline.limits())),
        }
    }
    info!(
        "Analyzed {} payloads: {} valid, {} invalid.",
        raws.len(),
        valid_cards.len(),
        invalid.len()
    );

    let stats = stats(&valid_cards);
    let duplicates = deduplicate_by_title(&valid_cards).duplicates;
    let issues = collection_issues(invalid.len(), &valid_cards, &stats, duplicates.len());

    CollectionAnalysis {
        valid_cards,
        invalid_count: invalid.len(),
        invalid,
        stats,
        duplicates,
        issues,
    }
}
