use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeightedDictError};

/// Rendering of a selected entry.
///
/// # Variants
/// - `Simple`: the bare value, `value`.
/// - `WeightedText`: the value and its weight, `(value:weight)`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
	Simple,
	#[default]
	WeightedText,
}

impl OutputFormat {
	/// Renders one entry.
	///
	/// Weights use their natural decimal form: `1.0`, `2.5`, `0.3`.
	pub fn render(self, value: &str, weight: f64) -> String {
		match self {
			Self::Simple => value.to_owned(),
			Self::WeightedText => format!("({value}:{weight:?})"),
		}
	}
}

impl FromStr for OutputFormat {
	type Err = WeightedDictError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim() {
			"simple" => Ok(Self::Simple),
			"weighted_text" => Ok(Self::WeightedText),
			other => Err(WeightedDictError::invalid(format!(
				"unknown format '{other}', expected 'simple' or 'weighted_text'"
			))),
		}
	}
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Simple => f.write_str("simple"),
			Self::WeightedText => f.write_str("weighted_text"),
		}
	}
}

/// How the entries of a group selection are chosen.
///
/// # Variants
/// - `Random`: weighted random draws.
/// - `Explicit(String)`: the keys named by a delimiter-separated key list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
	#[default]
	Random,
	Explicit(String),
}

/// Configuration of a group selection.
///
/// # Responsibilities
/// - Select the mode (`Random` or `Explicit`)
/// - Bound the number of selected entries (`count`)
/// - Control duplicate handling and output rendering
///
/// # Invariants
/// - `count`, when set through [`SelectionInput::set_count`], is at least 1
/// - `count` is required in `Random` mode and an optional cap in `Explicit` mode
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SelectionInput {
	/// Selection strategy.
	pub mode: SelectionMode,

	/// Number of entries to draw, or cap on the explicit key list.
	count: Option<usize>,

	/// Whether the same key may be selected more than once.
	pub allow_duplicates: bool,

	/// Rendering of each selected entry.
	pub format: OutputFormat,
}

impl Default for SelectionInput {
	fn default() -> Self {
		Self {
			mode: SelectionMode::Random,
			count: Some(3),
			allow_duplicates: false,
			format: OutputFormat::WeightedText,
		}
	}
}

impl SelectionInput {
	/// Random selection of `count` entries.
	///
	/// # Errors
	/// Returns an error if `count` is 0.
	pub fn random(count: usize) -> Result<Self> {
		let mut input = Self::default();
		input.set_count(count)?;
		Ok(input)
	}

	/// Explicit selection of every key named in `key_list`.
	pub fn explicit(key_list: impl Into<String>) -> Self {
		Self {
			mode: SelectionMode::Explicit(key_list.into()),
			count: None,
			..Self::default()
		}
	}

	/// Returns the configured count, if any.
	pub fn count(&self) -> Option<usize> {
		self.count
	}

	/// Sets the count.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `count` is 0.
	pub fn set_count(&mut self, count: usize) -> Result<()> {
		if count == 0 {
			return Err(WeightedDictError::invalid("count must be at least 1"));
		}
		self.count = Some(count);
		Ok(())
	}

	/// Removes the count (explicit mode then selects every parsed key).
	pub fn clear_count(&mut self) {
		self.count = None;
	}

	/// Builder-style duplicate policy.
	pub fn with_duplicates(mut self, allow_duplicates: bool) -> Self {
		self.allow_duplicates = allow_duplicates;
		self
	}

	/// Builder-style output format.
	pub fn with_format(mut self, format: OutputFormat) -> Self {
		self.format = format;
		self
	}
}
