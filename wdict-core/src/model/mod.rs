//! Top-level module for the weighted dictionary system.
//!
//! This module provides:
//! - The dictionary shapes and their conversions (`weighted_dict`)
//! - A key-list tokenizer (`key_parser`)
//! - Weighted and explicit selection (`selection`)
//! - Group selection configuration (`selection_input`)
//! - Placeholder substitution (`template`)

/// Raw and reformatted dictionary shapes, construction, merging
/// and conversion between them.
pub mod weighted_dict;

/// Tokenizer for delimiter-separated key lists with quoted segments.
pub mod key_parser;

/// Selection engine: weighted random picks and explicit picks by key.
///
/// Random operations take an injected `rand::Rng`.
pub mod selection;

/// Group selection configuration.
///
/// Stores the selection mode, count, duplicate policy and output format.
pub mod selection_input;

/// `{{ key }}` template rendering from a dictionary's values.
pub mod template;
