use std::collections::{HashMap, HashSet};

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::key_parser::parse_key_string;
use super::selection_input::{OutputFormat, SelectionInput, SelectionMode};
use super::weighted_dict::{Entry, ReformattedDict, WeightedValue};
use crate::error::{Result, WeightedDictError};

/// Result of a group selection.
///
/// - `entries`: selected `(key, value, weight)` triples in selection order,
///   duplicates included.
/// - `formatted`: rendered entries joined by `\n`.
/// - `residual`: selected entries in reformatted form. A key selected more
///   than once is stored again under `key_<n>` for its n-th occurrence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Selection {
	pub entries: Vec<Entry>,
	pub formatted: String,
	pub residual: ReformattedDict,
}

impl Selection {
	/// Builds a selection from keys known to exist in `dict`.
	fn from_keys(dict: &ReformattedDict, keys: &[&str], format: OutputFormat) -> Self {
		let mut selection = Self::default();
		let mut occurrences: HashMap<&str, usize> = HashMap::new();
		// Real keys are never handed out as synthesized names
		let reserved: HashSet<&str> = keys.iter().copied().collect();
		let mut lines = Vec::with_capacity(keys.len());

		for &key in keys {
			// Keys come from `dict` or were validated against it
			let Some(entry) = dict.get(key) else { continue };

			let occurrence = occurrences.entry(key).or_insert(0);
			*occurrence += 1;
			let residual_key = if *occurrence == 1 {
				key.to_owned()
			} else {
				Self::disambiguate(&selection.residual, &reserved, key, *occurrence)
			};

			lines.push(format.render(&entry.value, entry.weight));
			selection.residual.insert(residual_key, entry.clone());
			selection.entries.push(Entry {
				key: key.to_owned(),
				value: entry.value.clone(),
				weight: entry.weight,
			});
		}

		selection.formatted = lines.join("\n").trim_end().to_owned();
		selection
	}

	/// Finds a `key_<n>` name, starting at the occurrence index, that is
	/// neither in the residual yet nor one of the selected keys.
	fn disambiguate(residual: &ReformattedDict, reserved: &HashSet<&str>, key: &str, occurrence: usize) -> String {
		let mut n = occurrence;
		loop {
			let candidate = format!("{key}_{n}");
			if !residual.contains_key(&candidate) && !reserved.contains(candidate.as_str()) {
				return candidate;
			}
			n += 1;
		}
	}

	/// Number of selected entries, duplicates included.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether nothing was selected.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Draws one index with probability proportional to `weights`.
///
/// One uniform number in `[0, total)` is drawn, then walked down the
/// pool: each positive weight either contains it or is subtracted from it.
/// Zero weights own no interval and are never drawn.
///
/// # Errors
/// Returns `InvalidArgument` if the pool is empty, holds a negative or
/// non-finite weight, or its total weight is not positive.
fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<usize> {
	if weights.is_empty() {
		return Err(WeightedDictError::invalid("cannot select from an empty dictionary"));
	}
	if let Some(weight) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
		return Err(WeightedDictError::invalid(format!(
			"weights must be non-negative numbers, got {weight}"
		)));
	}

	let total: f64 = weights.iter().sum();
	if total.is_nan() || total <= 0.0 || total.is_infinite() {
		return Err(WeightedDictError::invalid(format!(
			"total weight must be a positive number to draw, got {total}"
		)));
	}

	let mut r = rng.random_range(0.0..total);

	let mut fallback = None;
	for (index, &weight) in weights.iter().enumerate() {
		if weight <= 0.0 {
			continue;
		}
		if r < weight {
			return Ok(index);
		}
		r -= weight;
		fallback = Some(index);
	}

	// Rounding can leave `r` just above the last bucket
	fallback.ok_or_else(|| WeightedDictError::invalid("no positive weight to draw from"))
}

/// Draws `count` keys by weight.
///
/// - With duplicates: `count` independent draws over the full pool.
/// - Without: sequential draws without replacement, each chosen key leaving
///   the pool. Stops early once no positive weight remains, so at most
///   `min(count, keys)` keys are returned.
fn draw_keys<'a, R: Rng + ?Sized>(
	dict: &'a ReformattedDict,
	count: usize,
	allow_duplicates: bool,
	rng: &mut R,
) -> Result<Vec<&'a str>> {
	let mut keys: Vec<&str> = dict.keys().collect();
	let mut weights: Vec<f64> = dict.iter().map(|(_, entry)| entry.weight).collect();

	if count == 0 {
		return Ok(Vec::new());
	}

	let mut selected = Vec::with_capacity(count);
	if allow_duplicates {
		for _ in 0..count {
			selected.push(keys[weighted_index(&weights, rng)?]);
		}
	} else {
		let count = count.min(keys.len());
		while selected.len() < count {
			let index = match weighted_index(&weights, rng) {
				Ok(index) => index,
				// Only zero weights left after a first successful draw
				Err(_) if !selected.is_empty() => break,
				Err(e) => return Err(e),
			};
			selected.push(keys.remove(index));
			weights.remove(index);
		}
	}

	debug!(
		"drew {} of {} requested keys from {} (duplicates: {allow_duplicates})",
		selected.len(),
		count,
		dict.len()
	);
	Ok(selected)
}

/// Picks one value at random, proportionally to the weights.
///
/// # Errors
/// Returns `InvalidArgument` if the dictionary is empty or all weights are 0.
pub fn pick_random<R: Rng + ?Sized>(dict: &ReformattedDict, rng: &mut R) -> Result<String> {
	let weights: Vec<f64> = dict.iter().map(|(_, entry)| entry.weight).collect();
	let index = weighted_index(&weights, rng)?;
	// `index` is within bounds of the same iteration order
	let (_, WeightedValue { value, .. }) = dict
		.iter()
		.nth(index)
		.ok_or_else(|| WeightedDictError::invalid("selection index out of range"))?;
	Ok(value.clone())
}

/// Looks up one key and renders it with `format`.
///
/// # Errors
/// Returns `KeyNotFound` if `key` is absent.
pub fn pick_by_key(dict: &ReformattedDict, key: &str, format: OutputFormat) -> Result<String> {
	let entry = dict.get(key).ok_or_else(|| WeightedDictError::key_not_found(key))?;
	Ok(format.render(&entry.value, entry.weight))
}

/// Picks `count` entries at random, rendered as `(value:weight)` lines.
///
/// Without duplicates, asking for more entries than available returns
/// every available entry.
///
/// # Errors
/// Returns `InvalidArgument` if a draw is needed and all weights are 0.
pub fn pick_group_random<R: Rng + ?Sized>(
	dict: &ReformattedDict,
	count: usize,
	allow_duplicates: bool,
	rng: &mut R,
) -> Result<Selection> {
	let keys = draw_keys(dict, count, allow_duplicates, rng)?;
	Ok(Selection::from_keys(dict, &keys, OutputFormat::WeightedText))
}

/// Picks the entries named by a delimiter-separated key list.
///
/// # Behavior
/// - Parses `key_list` with [`parse_key_string`].
/// - Every parsed key is checked before anything is selected.
/// - Without duplicates, repeated keys keep their first occurrence.
/// - `count`, when given, keeps the first `count` keys.
///
/// # Errors
/// - `InvalidArgument` if the list yields no key.
/// - `KeyNotFound` listing every missing key.
pub fn pick_group_explicit(
	dict: &ReformattedDict,
	key_list: &str,
	allow_duplicates: bool,
	format: OutputFormat,
	count: Option<usize>,
) -> Result<Selection> {
	let parsed = parse_key_string(Some(key_list));
	if parsed.is_empty() {
		return Err(WeightedDictError::invalid("selected keys must be provided"));
	}

	let mut missing: Vec<String> = Vec::new();
	for key in &parsed {
		if !dict.contains_key(key) && !missing.contains(key) {
			missing.push(key.clone());
		}
	}
	if !missing.is_empty() {
		return Err(WeightedDictError::KeyNotFound(missing));
	}

	let mut keys: Vec<&str> = Vec::with_capacity(parsed.len());
	for key in &parsed {
		if allow_duplicates || !keys.contains(&key.as_str()) {
			keys.push(key);
		}
	}
	if let Some(count) = count {
		if count < keys.len() {
			debug!("truncating {} explicit keys to {count}", keys.len());
			keys.truncate(count);
		}
	}

	Ok(Selection::from_keys(dict, &keys, format))
}

/// Runs a group selection described by a [`SelectionInput`].
///
/// # Errors
/// - `InvalidArgument` if random mode has no count or a count of 0.
/// - Any error of [`pick_group_random`] or [`pick_group_explicit`].
pub fn select_group<R: Rng + ?Sized>(
	dict: &ReformattedDict,
	input: &SelectionInput,
	rng: &mut R,
) -> Result<Selection> {
	match &input.mode {
		SelectionMode::Random => {
			let count = match input.count() {
				Some(count) if count > 0 => count,
				_ => return Err(WeightedDictError::invalid("random selection requires a count of at least 1")),
			};
			let keys = draw_keys(dict, count, input.allow_duplicates, rng)?;
			Ok(Selection::from_keys(dict, &keys, input.format))
		}
		SelectionMode::Explicit(key_list) => {
			pick_group_explicit(dict, key_list, input.allow_duplicates, input.format, input.count())
		}
	}
}

#[cfg(test)]
mod tests {
	use rand::rngs::StdRng;
	use rand::{RngCore, SeedableRng};

	use super::*;
	use crate::model::weighted_dict::{build, reformat};

	/// Deterministic source: the k-th draw sits in the middle of the k-th
	/// of `cells` equal slices of `[0, 1)`, cycling.
	struct GridRng {
		next: u64,
		cells: u64,
	}

	impl GridRng {
		fn new(cells: u64) -> Self {
			Self { next: 0, cells }
		}
	}

	impl RngCore for GridRng {
		fn next_u32(&mut self) -> u32 {
			(self.next_u64() >> 32) as u32
		}

		fn next_u64(&mut self) -> u64 {
			let step = u64::MAX / (2 * self.cells);
			let value = (2 * self.next + 1) * step;
			self.next = (self.next + 1) % self.cells;
			value
		}

		fn fill_bytes(&mut self, dst: &mut [u8]) {
			for chunk in dst.chunks_mut(8) {
				let bytes = self.next_u64().to_le_bytes();
				chunk.copy_from_slice(&bytes[..chunk.len()]);
			}
		}
	}

	fn animals() -> ReformattedDict {
		reformat(&build([("cat", "meow", 2.0), ("dog", "woof", 1.0), ("bird", "chirp", 1.0)]).unwrap()).unwrap()
	}

	fn keys_dict() -> ReformattedDict {
		reformat(&build([("key1", "value1", 0.5), ("key2", "value2", 0.3)]).unwrap()).unwrap()
	}

	#[test]
	fn weighted_index_never_draws_zero_weight() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..500 {
			assert_eq!(weighted_index(&[0.0, 3.0, 0.0], &mut rng).unwrap(), 1);
		}
	}

	#[test]
	fn weighted_index_rejects_zero_total() {
		let mut rng = StdRng::seed_from_u64(7);
		assert!(weighted_index(&[], &mut rng).is_err());
		assert!(weighted_index(&[0.0, 0.0], &mut rng).is_err());
	}

	#[test]
	fn pick_random_splits_an_even_grid_by_weight() {
		let dict = animals();
		let mut rng = GridRng::new(1000);
		let mut counts: HashMap<String, usize> = HashMap::new();
		for _ in 0..1000 {
			*counts.entry(pick_random(&dict, &mut rng).unwrap()).or_insert(0) += 1;
		}
		assert_eq!(counts["meow"], 500);
		assert_eq!(counts["woof"], 250);
		assert_eq!(counts["chirp"], 250);
	}

	#[test]
	fn pick_random_favors_heavier_key_with_a_seed() {
		let dict = animals();
		let mut rng = StdRng::seed_from_u64(42);
		let meows = (0..1000)
			.filter(|_| pick_random(&dict, &mut rng).unwrap() == "meow")
			.count();
		assert!(meows > 400 && meows < 600, "meow drawn {meows} times");
	}

	#[test]
	fn pick_random_is_reproducible_with_a_seed() {
		let dict = animals();
		let draws = |seed| {
			let mut rng = StdRng::seed_from_u64(seed);
			(0..20).map(|_| pick_random(&dict, &mut rng).unwrap()).collect::<Vec<_>>()
		};
		assert_eq!(draws(3), draws(3));
	}

	#[test]
	fn pick_random_rejects_all_zero_weights() {
		let dict = reformat(&build([("a", "x", 0.0), ("b", "y", 0.0)]).unwrap()).unwrap();
		let mut rng = StdRng::seed_from_u64(1);
		assert!(matches!(pick_random(&dict, &mut rng), Err(WeightedDictError::InvalidArgument(_))));
		assert!(pick_random(&ReformattedDict::new(), &mut rng).is_err());
	}

	#[test]
	fn pick_by_key_renders_formats() {
		let dict = reformat(&build([("k", "v", 2.5)]).unwrap()).unwrap();
		assert_eq!(pick_by_key(&dict, "k", OutputFormat::WeightedText).unwrap(), "(v:2.5)");
		assert_eq!(pick_by_key(&dict, "k", OutputFormat::Simple).unwrap(), "v");
		assert_eq!(
			pick_by_key(&dict, "nope", OutputFormat::Simple),
			Err(WeightedDictError::KeyNotFound(vec!["nope".to_owned()]))
		);
	}

	#[test]
	fn zero_weight_key_is_selectable_by_name() {
		let dict = reformat(&build([("k", "v", 0.0)]).unwrap()).unwrap();
		assert_eq!(pick_by_key(&dict, "k", OutputFormat::WeightedText).unwrap(), "(v:0.0)");
	}

	#[test]
	fn group_random_without_duplicates_is_capped() {
		let dict = animals();
		let mut rng = StdRng::seed_from_u64(11);
		let selection = pick_group_random(&dict, 5, false, &mut rng).unwrap();
		assert_eq!(selection.len(), 3);
		assert_eq!(selection.residual.len(), 3);
		assert_eq!(selection.formatted.lines().count(), 3);
	}

	#[test]
	fn group_random_without_duplicates_is_distinct() {
		let dict = animals();
		let mut rng = StdRng::seed_from_u64(5);
		for _ in 0..50 {
			let selection = pick_group_random(&dict, 2, false, &mut rng).unwrap();
			assert_eq!(selection.len(), 2);
			assert_ne!(selection.entries[0].key, selection.entries[1].key);
			let residual_keys: Vec<&str> = selection.residual.keys().collect();
			let entry_keys: Vec<&str> = selection.entries.iter().map(|e| e.key.as_str()).collect();
			assert_eq!(residual_keys, entry_keys);
		}
	}

	#[test]
	fn group_random_with_duplicates_keeps_every_draw() {
		let dict = reformat(&build([("only", "one", 1.0)]).unwrap()).unwrap();
		let mut rng = StdRng::seed_from_u64(9);
		let selection = pick_group_random(&dict, 4, true, &mut rng).unwrap();
		assert_eq!(selection.len(), 4);
		assert_eq!(selection.formatted, "(one:1.0)\n(one:1.0)\n(one:1.0)\n(one:1.0)");
		assert_eq!(
			selection.residual.keys().collect::<Vec<_>>(),
			vec!["only", "only_2", "only_3", "only_4"]
		);
	}

	#[test]
	fn group_random_stops_when_only_zero_weights_remain() {
		let dict = reformat(&build([("a", "x", 1.0), ("b", "y", 0.0)]).unwrap()).unwrap();
		let mut rng = StdRng::seed_from_u64(2);
		let selection = pick_group_random(&dict, 2, false, &mut rng).unwrap();
		assert_eq!(selection.entries.len(), 1);
		assert_eq!(selection.entries[0].key, "a");
	}

	#[test]
	fn group_explicit_renders_in_list_order() {
		let dict = keys_dict();
		let simple = pick_group_explicit(&dict, "key1,key2", false, OutputFormat::Simple, None).unwrap();
		assert_eq!(simple.formatted, "value1\nvalue2");
		let weighted = pick_group_explicit(&dict, "key1,key2", false, OutputFormat::WeightedText, None).unwrap();
		assert_eq!(weighted.formatted, "(value1:0.5)\n(value2:0.3)");
		assert_eq!(weighted.residual.keys().collect::<Vec<_>>(), vec!["key1", "key2"]);
	}

	#[test]
	fn group_explicit_reports_all_missing_keys() {
		let dict = keys_dict();
		assert_eq!(
			pick_group_explicit(&dict, "key1, nope; other,nope", false, OutputFormat::Simple, None),
			Err(WeightedDictError::KeyNotFound(vec!["nope".to_owned(), "other".to_owned()]))
		);
	}

	#[test]
	fn group_explicit_requires_keys() {
		let dict = keys_dict();
		for list in ["", "   ", ",;, ;"] {
			assert!(matches!(
				pick_group_explicit(&dict, list, false, OutputFormat::Simple, None),
				Err(WeightedDictError::InvalidArgument(_))
			));
		}
	}

	#[test]
	fn group_explicit_duplicates() {
		let dict = keys_dict();
		let deduped = pick_group_explicit(&dict, "key1,key2,key1", false, OutputFormat::Simple, None).unwrap();
		assert_eq!(deduped.formatted, "value1\nvalue2");

		let kept = pick_group_explicit(&dict, "key1,key2,key1", true, OutputFormat::Simple, None).unwrap();
		assert_eq!(kept.formatted, "value1\nvalue2\nvalue1");
		assert_eq!(kept.residual.keys().collect::<Vec<_>>(), vec!["key1", "key2", "key1_2"]);
	}

	#[test]
	fn group_explicit_duplicates_do_not_shadow_real_keys() {
		let dict = reformat(&build([("a", "A", 1.0), ("a_2", "A2", 1.0)]).unwrap()).unwrap();
		let selection = pick_group_explicit(&dict, "a,a,a_2", true, OutputFormat::Simple, None).unwrap();
		assert_eq!(selection.formatted, "A\nA\nA2");
		assert_eq!(selection.residual.len(), 3);
		assert_eq!(selection.residual.keys().collect::<Vec<_>>(), vec!["a", "a_3", "a_2"]);
		assert_eq!(selection.residual.get("a_2").unwrap().value, "A2");
		assert_eq!(selection.residual.get("a_3").unwrap().value, "A");
	}

	#[test]
	fn group_random_duplicates_do_not_shadow_real_keys() {
		let dict = reformat(&build([("a", "A", 1.0), ("a_2", "A2", 1.0)]).unwrap()).unwrap();
		// Three draws land in the first half of the grid, three in the second
		let mut rng = GridRng::new(6);
		let selection = pick_group_random(&dict, 6, true, &mut rng).unwrap();
		assert_eq!(selection.len(), 6);
		assert_eq!(
			selection.residual.keys().collect::<Vec<_>>(),
			vec!["a", "a_3", "a_4", "a_2", "a_2_2", "a_2_3"]
		);
	}

	#[test]
	fn draws_reject_negative_weights() {
		let mut rng = StdRng::seed_from_u64(3);
		assert!(matches!(
			weighted_index(&[1.0, -0.5, 1.0], &mut rng),
			Err(WeightedDictError::InvalidArgument(_))
		));
		assert!(weighted_index(&[1.0, f64::INFINITY], &mut rng).is_err());

		let dict: ReformattedDict = serde_json::from_str(
			r#"{"a": {"value": "A", "weight": 1}, "b": {"value": "B", "weight": -0.5}}"#,
		)
		.unwrap();
		assert!(pick_random(&dict, &mut rng).is_err());
		assert!(pick_group_random(&dict, 1, false, &mut rng).is_err());
	}

	#[test]
	fn group_explicit_count_truncates_after_dedup() {
		let dict = keys_dict();
		let selection = pick_group_explicit(&dict, "key1,key1,key2", false, OutputFormat::Simple, Some(2)).unwrap();
		assert_eq!(selection.formatted, "value1\nvalue2");
		let selection = pick_group_explicit(&dict, "key2,key1", false, OutputFormat::Simple, Some(1)).unwrap();
		assert_eq!(selection.formatted, "value2");
	}

	#[test]
	fn select_group_dispatches_on_mode() {
		let dict = keys_dict();
		let mut rng = StdRng::seed_from_u64(4);

		let input = SelectionInput::explicit("key2").with_format(OutputFormat::Simple);
		assert_eq!(select_group(&dict, &input, &mut rng).unwrap().formatted, "value2");

		let input = SelectionInput::random(2).unwrap().with_format(OutputFormat::Simple);
		let selection = select_group(&dict, &input, &mut rng).unwrap();
		assert_eq!(selection.len(), 2);
		assert!(selection.formatted.contains("value1") && selection.formatted.contains("value2"));

		let mut input = SelectionInput::default();
		input.clear_count();
		assert!(matches!(
			select_group(&dict, &input, &mut rng),
			Err(WeightedDictError::InvalidArgument(_))
		));
	}

	#[test]
	fn selection_does_not_mutate_input() {
		let dict = animals();
		let before = dict.clone();
		let mut rng = StdRng::seed_from_u64(8);
		let _ = pick_group_random(&dict, 3, false, &mut rng).unwrap();
		let _ = pick_group_explicit(&dict, "cat,dog", true, OutputFormat::Simple, None).unwrap();
		assert_eq!(dict, before);
	}
}
