//! Relation consistency errors

use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::store::RecordStore)
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
	/// The queried table does not exist in the store
	#[error("unknown table '{table}'")]
	UnknownTable { table: String },

	/// The backing store failed
	#[error("store error: {message}")]
	Backend { message: String },
}

/// A relation constraint violated by a record instance
///
/// Every variant that concerns a relation names it. When the relation carries
/// a custom message, violations are reported as [`RelationError::Custom`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelationError {
	#[error("relation {relation} is required")]
	Required { relation: String },

	#[error("referenced {resource} with {reference_field} = {value} does not exist")]
	NotFound {
		relation: String,
		resource: String,
		reference_field: String,
		/// Display form of the missing reference
		value: String,
	},

	#[error("relation {relation} requires at least {min} items, got {actual}")]
	TooFew {
		relation: String,
		min: usize,
		actual: usize,
	},

	#[error("relation {relation} allows at most {max} items, got {actual}")]
	TooMany {
		relation: String,
		max: usize,
		actual: usize,
	},

	/// A to-many relation was given something other than a sequence
	#[error("relation {relation} expects a sequence, got {found}")]
	NotASequence { relation: String, found: String },

	/// Existence checking was requested for a relation without a reference field
	#[error("relation {relation} has no reference field to check existence against")]
	MissingReferenceField { relation: String },

	/// The candidate object lacks the reference field
	#[error("relation {relation} value has no '{reference_field}' key")]
	MissingReferenceValue {
		relation: String,
		reference_field: String,
	},

	#[error("relation {relation} targets unregistered resource '{resource}'")]
	UnknownResource { relation: String, resource: String },

	/// The validated instance is not a composite record
	#[error("cannot validate relations of a non-record value ({found})")]
	NotARecord { found: String },

	#[error("relation {relation}: {source}")]
	Store {
		relation: String,
		#[source]
		source: StoreError,
	},

	#[error("{message}")]
	Custom { relation: String, message: String },
}

impl RelationError {
	/// Name of the relation the error concerns
	pub fn relation(&self) -> Option<&str> {
		match self {
			Self::Required { relation }
			| Self::NotFound { relation, .. }
			| Self::TooFew { relation, .. }
			| Self::TooMany { relation, .. }
			| Self::NotASequence { relation, .. }
			| Self::MissingReferenceField { relation }
			| Self::MissingReferenceValue { relation, .. }
			| Self::UnknownResource { relation, .. }
			| Self::Store { relation, .. }
			| Self::Custom { relation, .. } => Some(relation),
			Self::NotARecord { .. } => None,
		}
	}

	/// Whether the error is a constraint violation rather than a setup problem
	pub fn is_violation(&self) -> bool {
		matches!(
			self,
			Self::Required { .. }
				| Self::NotFound { .. }
				| Self::TooFew { .. }
				| Self::TooMany { .. }
				| Self::NotASequence { .. }
				| Self::MissingReferenceValue { .. }
				| Self::Custom { .. }
		)
	}
}

/// JSON kind name used in error messages
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "boolean",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
}
