use log::trace;

use super::weighted_dict::{ReformattedDict, WeightedDict};

/// Replaces `{{ key }}` and `{{key}}` placeholders with dictionary values.
///
/// # Behavior
/// - Both spellings are replaced for every key, every occurrence.
/// - Placeholders naming an unknown key are left untouched.
/// - Substitution is literal: no escaping, nesting or control flow.
///
/// Raw dictionaries are read through their `items`, reformatted ones
/// through each entry's `value`.
pub fn render(template: &str, dict: &WeightedDict) -> String {
	match dict {
		WeightedDict::Raw(raw) => substitute(template, raw.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
		WeightedDict::Reformatted(dict) => render_reformatted(template, dict),
	}
}

/// [`render`] for a reformatted dictionary.
pub fn render_reformatted(template: &str, dict: &ReformattedDict) -> String {
	substitute(template, dict.iter().map(|(k, entry)| (k, entry.value.as_str())))
}

fn substitute<'a, I>(template: &str, values: I) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let mut rendered = template.to_owned();
	for (key, value) in values {
		for placeholder in [format!("{{{{ {key} }}}}"), format!("{{{{{key}}}}}")] {
			if rendered.contains(&placeholder) {
				trace!("substituting {placeholder}");
				rendered = rendered.replace(&placeholder, value);
			}
		}
	}
	rendered
}
