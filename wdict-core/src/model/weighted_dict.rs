use std::borrow::Cow;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeightedDictError};

/// One `(key, value, weight)` triple used to build a dictionary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Entry {
	pub key: String,
	pub value: String,
	pub weight: f64,
}

impl<K: Into<String>, V: Into<String>> From<(K, V, f64)> for Entry {
	fn from((key, value, weight): (K, V, f64)) -> Self {
		Self { key: key.into(), value: value.into(), weight }
	}
}

/// A value together with its relative sampling weight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeightedValue {
	pub value: String,
	pub weight: f64,
}

impl WeightedValue {
	pub fn new(value: impl Into<String>, weight: f64) -> Self {
		Self { value: value.into(), weight }
	}
}

/// Raw form of a weighted dictionary: two parallel mappings.
///
/// # Invariants
/// - `items` and `weights` share the same key set
/// - Every weight is finite and `>= 0.0`
///
/// Both maps keep insertion order. The invariants hold for dictionaries
/// produced by [`build`] and [`concat`] from valid inputs; hand-built or
/// deserialized values are checked by [`RawDict::validate`] and at the
/// [`reformat`] boundary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RawDict {
	pub items: IndexMap<String, String>,
	pub weights: IndexMap<String, f64>,
}

impl RawDict {
	/// Number of entries (keys of `items`).
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Whether the dictionary has no entry.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Checks that `items` and `weights` describe the same keys and that
	/// every weight is finite and `>= 0.0`.
	///
	/// # Errors
	/// Returns `MalformedDictionary` naming the first key present in only
	/// one of the two mappings, or the first key with an invalid weight.
	pub fn validate(&self) -> Result<()> {
		for (key, weight) in &self.weights {
			check_weight(key, *weight)?;
		}
		if let Some(key) = self.items.keys().find(|k| !self.weights.contains_key(*k)) {
			return Err(WeightedDictError::MalformedDictionary(format!("key '{key}' has no weight")));
		}
		if let Some(key) = self.weights.keys().find(|k| !self.items.contains_key(*k)) {
			return Err(WeightedDictError::MalformedDictionary(format!("key '{key}' has no item")));
		}
		Ok(())
	}
}

/// Reformatted form of a weighted dictionary: `key -> {value, weight}`.
///
/// Iteration follows insertion order. Weights are expected finite and
/// `>= 0.0`; [`ReformattedDict::validate`] checks it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(transparent)]
pub struct ReformattedDict(IndexMap<String, WeightedValue>);

impl ReformattedDict {
	/// Creates an empty dictionary.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces an entry. A replaced key keeps its position.
	pub fn insert(&mut self, key: impl Into<String>, entry: WeightedValue) -> Option<WeightedValue> {
		self.0.insert(key.into(), entry)
	}

	/// Returns the entry stored under `key`.
	pub fn get(&self, key: &str) -> Option<&WeightedValue> {
		self.0.get(key)
	}

	/// Whether `key` is present.
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the dictionary has no entry.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Keys in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// `(key, entry)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightedValue)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Checks that every weight is finite and `>= 0.0`.
	///
	/// # Errors
	/// Returns `MalformedDictionary` naming the first key with an invalid weight.
	pub fn validate(&self) -> Result<()> {
		for (key, entry) in &self.0 {
			check_weight(key, entry.weight)?;
		}
		Ok(())
	}

	/// Sum of all weights.
	pub fn total_weight(&self) -> f64 {
		self.0.values().map(|entry| entry.weight).sum()
	}

	/// Converts back to the raw form, keeping key order.
	pub fn to_raw(&self) -> RawDict {
		let mut raw = RawDict::default();
		for (key, entry) in &self.0 {
			raw.items.insert(key.clone(), entry.value.clone());
			raw.weights.insert(key.clone(), entry.weight);
		}
		raw
	}
}

impl FromIterator<(String, WeightedValue)> for ReformattedDict {
	fn from_iter<I: IntoIterator<Item = (String, WeightedValue)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// A weighted dictionary in either shape.
///
/// Deserialization resolves the shape once: an object made exactly of
/// `items` and `weights` is raw, anything else is reformatted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum WeightedDict {
	Raw(RawDict),
	Reformatted(ReformattedDict),
}

impl WeightedDict {
	/// Returns the reformatted view, converting raw dictionaries on the fly.
	///
	/// # Errors
	/// Returns `MalformedDictionary` if a raw dictionary has an item with no
	/// weight, or if any weight is negative or not finite.
	pub fn reformatted(&self) -> Result<Cow<'_, ReformattedDict>> {
		match self {
			Self::Raw(raw) => Ok(Cow::Owned(reformat(raw)?)),
			Self::Reformatted(dict) => {
				dict.validate()?;
				Ok(Cow::Borrowed(dict))
			}
		}
	}
}

impl From<RawDict> for WeightedDict {
	fn from(raw: RawDict) -> Self {
		Self::Raw(raw)
	}
}

impl From<ReformattedDict> for WeightedDict {
	fn from(dict: ReformattedDict) -> Self {
		Self::Reformatted(dict)
	}
}

/// Builds a raw dictionary from an ordered list of entries.
///
/// # Behavior
/// - A duplicate key overwrites both its value and weight ("last write wins").
/// - Iteration order follows the first occurrence of each key.
///
/// # Errors
/// Returns `InvalidArgument` for an empty key or a negative / non-finite weight.
pub fn build<I, E>(entries: I) -> Result<RawDict>
where
	I: IntoIterator<Item = E>,
	E: Into<Entry>,
{
	let mut raw = RawDict::default();
	for entry in entries {
		let Entry { key, value, weight } = entry.into();
		if key.is_empty() {
			return Err(WeightedDictError::invalid("dictionary keys must not be empty"));
		}
		if !weight.is_finite() || weight < 0.0 {
			return Err(WeightedDictError::invalid(format!(
				"weight for key '{key}' must be a non-negative number, got {weight}"
			)));
		}
		raw.items.insert(key.clone(), value);
		raw.weights.insert(key, weight);
	}
	Ok(raw)
}

/// Rejects negative and non-finite weights.
fn check_weight(key: &str, weight: f64) -> Result<()> {
	if !weight.is_finite() || weight < 0.0 {
		return Err(WeightedDictError::MalformedDictionary(format!(
			"weight for key '{key}' must be a non-negative number, got {weight}"
		)));
	}
	Ok(())
}

/// Converts a raw dictionary into the reformatted form.
///
/// Keys follow the insertion order of `items`.
///
/// # Errors
/// Returns `MalformedDictionary` if a key of `items` is missing from
/// `weights` or has a negative / non-finite weight.
pub fn reformat(raw: &RawDict) -> Result<ReformattedDict> {
	raw.items
		.iter()
		.map(|(key, value)| {
			let weight = raw.weights.get(key).ok_or_else(|| {
				WeightedDictError::MalformedDictionary(format!("key '{key}' has no weight"))
			})?;
			check_weight(key, *weight)?;
			Ok((key.clone(), WeightedValue::new(value.clone(), *weight)))
		})
		.collect()
}

/// Merges dictionaries, later ones overriding earlier ones key by key.
///
/// The first dictionary is the primary one; its keys keep their positions
/// and new keys are appended in argument order. Optional dictionaries can be
/// skipped by flattening them out of the iterator beforehand.
///
/// # Errors
/// Returns `InvalidArgument` if no dictionary is given.
pub fn concat<'a, I>(dicts: I) -> Result<RawDict>
where
	I: IntoIterator<Item = &'a RawDict>,
{
	let mut dicts = dicts.into_iter();
	let mut merged = dicts
		.next()
		.cloned()
		.ok_or_else(|| WeightedDictError::invalid("at least one dictionary must be provided"))?;

	let mut count = 1;
	for other in dicts {
		for (key, value) in &other.items {
			merged.items.insert(key.clone(), value.clone());
		}
		for (key, weight) in &other.weights {
			merged.weights.insert(key.clone(), *weight);
		}
		count += 1;
	}
	debug!("merged {count} dictionaries into {} entries", merged.len());

	Ok(merged)
}
