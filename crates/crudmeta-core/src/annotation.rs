//! Field annotation mini-language
//!
//! Annotations are semicolon-separated token lists. Each token is either a bare
//! flag (`required`, `!searchable`) or a `key=value` pair (`min=3`,
//! `pattern=^[a-z]+$`). Only the first `=` separates key from value, so values
//! may contain further `=` characters.
//!
//! Flags are applied sequentially: when a flag and its negation both appear,
//! the last occurrence wins and no conflict is reported.
//!
//! # Examples
//!
//! ```
//! use crudmeta_core::annotation::{AnnotationToken, FlagSet, parse_annotation};
//!
//! let tokens = parse_annotation("required;min=3;!required");
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[1], AnnotationToken::pair("min", "3"));
//!
//! let flags = FlagSet::from_tokens(&tokens);
//! assert_eq!(flags.get("required"), Some(false));
//! ```

use std::collections::HashMap;

/// Token separator
pub const TOKEN_SEPARATOR: char = ';';
/// Prefix negating a bare flag
pub const NEGATION_PREFIX: char = '!';

/// A single parsed annotation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationToken {
	/// Bare flag, optionally negated with `!`
	Flag { name: String, negated: bool },
	/// `key=value` pair
	Pair { key: String, value: String },
}

impl AnnotationToken {
	pub fn flag(name: impl Into<String>, negated: bool) -> Self {
		Self::Flag {
			name: name.into(),
			negated,
		}
	}

	pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Pair {
			key: key.into(),
			value: value.into(),
		}
	}

	/// Returns the value of a pair token with the given key
	pub fn value_of(&self, wanted: &str) -> Option<&str> {
		match self {
			Self::Pair { key, value } if key == wanted => Some(value),
			_ => None,
		}
	}
}

/// Parses a raw annotation string into ordered tokens
///
/// Empty segments are dropped and surrounding whitespace is trimmed. A token
/// with an empty key (`=value`) or a lone `!` is meaningless and dropped.
pub fn parse_annotation(raw: &str) -> Vec<AnnotationToken> {
	raw.split(TOKEN_SEPARATOR)
		.filter_map(|segment| parse_token(segment.trim()))
		.collect()
}

fn parse_token(segment: &str) -> Option<AnnotationToken> {
	if segment.is_empty() {
		return None;
	}

	if let Some((key, value)) = segment.split_once('=') {
		let key = key.trim();
		if key.is_empty() {
			tracing::trace!(token = segment, "ignoring annotation token without key");
			return None;
		}
		return Some(AnnotationToken::pair(key, value.trim()));
	}

	match segment.strip_prefix(NEGATION_PREFIX) {
		Some(name) if name.trim().is_empty() => None,
		Some(name) => Some(AnnotationToken::flag(name.trim(), true)),
		None => Some(AnnotationToken::flag(segment, false)),
	}
}

/// Final state of every flag after sequential application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
	flags: HashMap<String, bool>,
}

impl FlagSet {
	/// Applies flag tokens in order; later tokens overwrite earlier ones
	pub fn from_tokens(tokens: &[AnnotationToken]) -> Self {
		let mut flags = HashMap::new();
		for token in tokens {
			if let AnnotationToken::Flag { name, negated } = token {
				flags.insert(name.clone(), !negated);
			}
		}
		Self { flags }
	}

	/// Resolved value of a flag, `None` when the flag never appeared
	pub fn get(&self, name: &str) -> Option<bool> {
		self.flags.get(name).copied()
	}

	/// Resolved value of a flag, or `default` when absent
	pub fn get_or(&self, name: &str, default: bool) -> bool {
		self.get(name).unwrap_or(default)
	}
}

/// Returns the last value given for `key`
pub fn last_value<'a>(tokens: &'a [AnnotationToken], key: &str) -> Option<&'a str> {
	tokens.iter().rev().find_map(|token| token.value_of(key))
}
