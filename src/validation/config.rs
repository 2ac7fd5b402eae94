//! Configuration value validation functions

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::ValidationError;

/// Check that `suffix` looks like `.ext`: a dot followed by word characters
///
/// `\w` is the Unicode word class (letters, marks, digits and connector
/// punctuation).
pub fn is_valid_suffix(suffix: &str) -> bool {
	static SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
	SUFFIX_RE.get_or_init(|| Regex::new(r"^\.\w+$").expect("valid regex")).is_match(suffix)
}

/// Validate a single file suffix
pub fn validate_suffix(suffix: &str) -> Result<(), ValidationError> {
	if !is_valid_suffix(suffix) {
		return Err(ValidationError::ConfigError(format!(
			"file suffixes must be of the form \".ext\", got {:?}",
			suffix
		)));
	}
	Ok(())
}

/// Validate a list of suffixes and collect them into a set
pub fn validate_suffixes<I, S>(suffixes: I) -> Result<BTreeSet<String>, ValidationError>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut set = BTreeSet::new();
	for suffix in suffixes {
		let suffix = suffix.as_ref();
		validate_suffix(suffix)?;
		set.insert(suffix.to_string());
	}
	Ok(set)
}

/// Validate a worker count is a positive integer
pub fn validate_pos_int(value: i64) -> Result<usize, ValidationError> {
	if value < 1 {
		return Err(ValidationError::ConfigError(format!("{} is not a positive integer", value)));
	}
	Ok(value as usize)
}
