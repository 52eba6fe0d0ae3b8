/// Characters splitting a key list into fields.
const DELIMITERS: [char; 2] = [',', ';'];

/// Characters opening and closing a literal region.
const QUOTES: [char; 2] = ['"', '\''];

/// Tokenizes a delimiter-separated list of keys.
///
/// # Behavior
/// - Splits on `,` and `;`.
/// - A delimiter inside a quoted region (`"..."` or `'...'`) is kept as
///   literal content, so `"a,b",c` yields `["a,b", "c"]`.
/// - A quote opens a region that only the same quote character closes.
///   An unmatched quote still toggles the state and is dropped.
/// - Each field is trimmed of whitespace and wrapping quotes. Empty fields
///   are dropped, so `a,,,b` yields `["a", "b"]`.
///
/// `None`, an empty string, or a string of delimiters and spaces yields an
/// empty list.
pub fn parse_key_string(input: Option<&str>) -> Vec<String> {
	let input = match input {
		Some(s) if !s.trim().is_empty() => s,
		_ => return Vec::new(),
	};

	let mut keys = Vec::new();
	let mut field = String::new();
	let mut quote: Option<char> = None;

	for c in input.chars() {
		match quote {
			Some(open) if c == open => quote = None,
			Some(_) => field.push(c),
			None if QUOTES.contains(&c) => quote = Some(c),
			None if DELIMITERS.contains(&c) => push_field(&mut keys, &mut field),
			None => field.push(c),
		}
	}
	push_field(&mut keys, &mut field);

	keys
}

/// Trims the pending field and appends it to `keys` if anything remains.
fn push_field(keys: &mut Vec<String>, field: &mut String) {
	let key = field
		.trim()
		.trim_matches(|c: char| QUOTES.contains(&c))
		.trim();
	if !key.is_empty() {
		keys.push(key.to_owned());
	}
	field.clear();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_commas() {
		assert_eq!(parse_key_string(Some("key1,key2")), vec!["key1", "key2"]);
	}

	#[test]
	fn keeps_commas_inside_quotes() {
		assert_eq!(
			parse_key_string(Some("\"key1,with,comma\",key2")),
			vec!["key1,with,comma", "key2"]
		);
		assert_eq!(parse_key_string(Some("'a;b' ; c")), vec!["a;b", "c"]);
	}

	#[test]
	fn empty_inputs_yield_nothing() {
		assert!(parse_key_string(None).is_empty());
		assert!(parse_key_string(Some("")).is_empty());
		assert!(parse_key_string(Some("   ")).is_empty());
		assert!(parse_key_string(Some(",,,")).is_empty());
		assert!(parse_key_string(Some(" ; , ;")).is_empty());
	}

	#[test]
	fn mixed_delimiters_and_runs_collapse() {
		assert_eq!(
			parse_key_string(Some(" key1 ,,; key2;key3 ")),
			vec!["key1", "key2", "key3"]
		);
	}

	#[test]
	fn unmatched_quote_toggles_and_is_dropped() {
		// Everything after the lone quote is literal, delimiters included.
		assert_eq!(parse_key_string(Some("a,\"b,c")), vec!["a", "b,c"]);
	}

	#[test]
	fn other_quote_is_literal_inside_region() {
		assert_eq!(parse_key_string(Some("\"it's\",x")), vec!["it's", "x"]);
	}

	#[test]
	fn is_deterministic() {
		let input = Some("'x, y'; z");
		assert_eq!(parse_key_string(input), parse_key_string(input));
	}
}
