//! Content safety for cards.
//!
//! `primitives` holds the pure single-value rules, `metadata` walks open JSON
//! payloads, and `card` applies the per-node rule table to a whole tree.

pub mod card;
pub mod metadata;
pub mod primitives;

pub use card::CardSanitizer;
pub use metadata::sanitize_metadata;
