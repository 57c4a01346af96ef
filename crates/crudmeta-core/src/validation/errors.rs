//! Field validation errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which constraint a value violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
	Required,
	MinValue,
	MaxValue,
	MinLength,
	MaxLength,
	Pattern,
	Conditional,
	Remote,
	Expression,
}

/// A constraint violation on a single field
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct FieldError {
	pub field: String,
	pub kind: FieldErrorKind,
	pub message: String,
}

impl FieldError {
	pub fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			kind,
			message: message.into(),
		}
	}
}
