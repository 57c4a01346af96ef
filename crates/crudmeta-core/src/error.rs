//! Errors raised while compiling resource metadata

use thiserror::Error;

/// Result type for metadata compilation
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors that can occur while introspecting a type or compiling its metadata
///
/// Most malformed annotation input is tolerated under the default
/// [`Leniency::Lenient`](crate::settings::Leniency) policy and never reaches
/// this type. Only [`MetadataError::NotARecord`] and the duplicate-name
/// variants are raised regardless of policy.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetadataError {
	/// The type handed to the compiler is not a composite record
	#[error("type '{type_name}' is not a record and cannot be introspected")]
	NotARecord {
		/// Declared name of the offending type
		type_name: String,
	},

	/// A field annotation could not be interpreted (strict mode only)
	#[error("invalid annotation on field '{field}': {reason}")]
	InvalidAnnotation {
		/// Field carrying the annotation
		field: String,
		/// Human readable reason
		reason: String,
	},

	/// A relation annotation is missing required keys (strict mode only)
	#[error("invalid relation annotation on field '{field}': {reason}")]
	InvalidRelation {
		/// Field carrying the annotation
		field: String,
		/// Human readable reason
		reason: String,
	},

	/// Two fields serialize under the same name
	#[error("duplicate field '{field}' in resource '{resource}'")]
	DuplicateField {
		/// Resource being compiled
		resource: String,
		/// Duplicated field name
		field: String,
	},

	/// Two relations share the same name
	#[error("duplicate relation '{relation}' in resource '{resource}'")]
	DuplicateRelation {
		/// Resource being compiled
		resource: String,
		/// Duplicated relation name
		relation: String,
	},

	/// A nested schema was requested for a field without a composite shape
	#[error("field '{field}' of type '{type_name}' has no nested schema")]
	NotComposite {
		/// Field name
		field: String,
		/// Declared type name of the field
		type_name: String,
	},
}
