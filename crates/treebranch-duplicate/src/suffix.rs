//! Identifier suffixing policy
//!
//! A copy of record `abc` made with token `2` is named `abc-2`. Suffixing is
//! idempotent, and copies of copies are named from the original base:
//! duplicating `abc-1` with token `2` yields `abc-2`, not `abc-1-2`.

use treebranch_types::prelude::*;

/// Default length limit of a trailing generation number
pub const DEFAULT_MAX_SUFFIX_DIGITS: usize = 6;

/// Appends `-token` to `base` unless it already ends with it
pub fn suffix(base: &str, token: &str) -> String {
	if has_suffix(base, token) { base.to_string() } else { format!("{}-{}", base, token) }
}

/// Whether `id` ends with exactly `-token`
pub fn has_suffix(id: &str, token: &str) -> bool {
	id.strip_suffix(token).is_some_and(|rest| rest.ends_with('-') && rest.len() > 1)
}

/// Removes one trailing `-<digits>` segment of at most `max_digits` digits
pub fn strip_suffix(id: &str, max_digits: usize) -> &str {
	match split_suffix(id, max_digits) {
		Some((base, _)) => base,
		None => id,
	}
}

/// Splits `id` into base and trailing generation number
pub fn split_suffix(id: &str, max_digits: usize) -> Option<(&str, u64)> {
	let (base, digits) = id.rsplit_once('-')?;
	if base.is_empty()
		|| digits.is_empty()
		|| digits.len() > max_digits
		|| !digits.bytes().all(|b| b.is_ascii_digit())
	{
		return None;
	}
	Some((base, digits.parse().ok()?))
}

/// Whether a column or row name is numeric data rather than a textual label
pub fn is_numeric_name(name: &str) -> bool {
	let name = name.trim();
	!name.is_empty() && name.parse::<f64>().is_ok()
}

/// Suffixing policy bound to one duplication run
#[derive(Debug, Clone)]
pub struct SuffixPolicy {
	token: String,
	max_digits: usize,
}

impl SuffixPolicy {
	pub fn new(token: impl Into<String>, max_digits: usize) -> TbResult<Self> {
		let token = token.into();
		if token.is_empty() {
			return Err(Error::ValidationError("empty suffix token".into()));
		}
		if token.contains('-') || token.chars().any(char::is_whitespace) {
			return Err(Error::ValidationError(format!("invalid suffix token: {}", token)));
		}
		Ok(Self { token, max_digits })
	}

	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn suffix(&self, base: &str) -> String {
		suffix(base, &self.token)
	}

	pub fn strip<'a>(&self, id: &'a str) -> &'a str {
		strip_suffix(id, self.max_digits)
	}

	/// Identifier of the copy of `id`
	pub fn derive(&self, id: &str) -> String {
		self.suffix(self.strip(id))
	}

	/// Column/row names: numeric names stay, textual names are suffixed
	pub fn column_name(&self, name: &str) -> String {
		if is_numeric_name(name) { name.to_string() } else { self.suffix(name) }
	}
}

/// Next free generation number for copies of `root_id` among `existing_ids`
pub fn next_generation<'a>(
	root_id: &str,
	existing_ids: impl IntoIterator<Item = &'a str>,
	max_digits: usize,
) -> u64 {
	let base = strip_suffix(root_id, max_digits);
	existing_ids
		.into_iter()
		.filter_map(|id| split_suffix(id, max_digits))
		.filter(|(b, _)| *b == base)
		.map(|(_, n)| n)
		.max()
		.map_or(1, |n| n + 1)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy(token: &str) -> SuffixPolicy {
		SuffixPolicy::new(token, DEFAULT_MAX_SUFFIX_DIGITS).unwrap()
	}

	#[test]
	fn test_suffix_idempotent() {
		for id in ["abc", "node_17", "a1b2c3", "x-y", "9c7f5a1e-7d13-4c3e-8f5e-1d2c3b4a5f60"] {
			let once = suffix(id, "1");
			assert_eq!(suffix(&once, "1"), once, "id: {}", id);
			assert_eq!(once, format!("{}-1", id));
		}
	}

	#[test]
	fn test_has_suffix() {
		assert!(has_suffix("abc-1", "1"));
		assert!(!has_suffix("abc-11", "1"));
		assert!(!has_suffix("abc1", "1"));
		assert!(!has_suffix("-1", "1"));
	}

	#[test]
	fn test_strip_single_segment() {
		assert_eq!(strip_suffix("abc-1", 6), "abc");
		assert_eq!(strip_suffix("abc-1-2", 6), "abc-1");
		assert_eq!(strip_suffix("abc", 6), "abc");
		assert_eq!(strip_suffix("abc-x1", 6), "abc-x1");
		assert_eq!(strip_suffix("-1", 6), "-1");
		// a UUID whose last group happens to be all digits is left alone
		assert_eq!(
			strip_suffix("9c7f5a1e-7d13-4c3e-8f5e-123456789012", 6),
			"9c7f5a1e-7d13-4c3e-8f5e-123456789012"
		);
	}

	#[test]
	fn test_derive_from_original_base() {
		let p = policy("2");
		assert_eq!(p.derive("abc"), "abc-2");
		assert_eq!(p.derive("abc-1"), "abc-2");
		assert_eq!(p.derive("abc-2"), "abc-2");
		assert_eq!(p.derive("node_5"), "node_5-2");
	}

	#[test]
	fn test_column_name() {
		let p = policy("1");
		assert_eq!(p.column_name("Orientation"), "Orientation-1");
		assert_eq!(p.column_name("Orientation-1"), "Orientation-1");
		assert_eq!(p.column_name("45"), "45");
		assert_eq!(p.column_name(" 2.5 "), " 2.5 ");
	}

	#[test]
	fn test_invalid_token() {
		assert!(SuffixPolicy::new("", 6).is_err());
		assert!(SuffixPolicy::new("1-2", 6).is_err());
		assert!(SuffixPolicy::new("a b", 6).is_err());
	}

	#[test]
	fn test_next_generation() {
		let ids = ["root", "root-1", "root-3", "other-7", "root-x"];
		assert_eq!(next_generation("root", ids, 6), 4);
		assert_eq!(next_generation("root-3", ids, 6), 4);
		assert_eq!(next_generation("other", ids, 6), 8);
		assert_eq!(next_generation("fresh", ids, 6), 1);
	}
}

// vim: ts=4
