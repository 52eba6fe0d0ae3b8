//! Weighted dictionary utilities.
//!
//! This crate provides a small toolkit around a "weighted dictionary",
//! a mapping from string keys to `(value, weight)` pairs:
//! - Dictionary construction, reformatting and merging
//! - Weighted random selection (single and group, with or without replacement)
//! - Explicit selection by key or by a quoted, delimiter-separated key list
//! - `{{ key }}` template rendering
//!
//! Every operation is a pure, synchronous function. Randomness is never
//! global: random selections take the random source as an argument.

/// Weighted dictionary model, selection engine and template renderer.
pub mod model;

/// Error type shared by every operation.
pub mod error;

pub use error::{Result, WeightedDictError};
