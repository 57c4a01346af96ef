//! Declarative validation specs and compiled rule sets

use super::conditional::{ConditionOutcome, ConditionalRule, as_number};
use super::errors::{FieldError, FieldErrorKind};
use crate::error::{MetadataError, Result};
use crate::settings::Leniency;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Compiled regular expression that serializes as its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
	pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
		Regex::new(source).map(Self)
	}

	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	pub fn is_match(&self, text: &str) -> bool {
		self.0.is_match(text)
	}
}

impl PartialEq for Pattern {
	fn eq(&self, other: &Self) -> bool {
		self.as_str() == other.as_str()
	}
}

impl Serialize for Pattern {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for Pattern {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let source = String::deserialize(deserializer)?;
		Pattern::new(&source).map_err(serde::de::Error::custom)
	}
}

/// Reference to an externally evaluated (asynchronous) validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncValidation {
	pub url: String,
}

/// Declarative description of a field's constraints
///
/// This is the input form: it may be deserialized from configuration or built
/// from field annotations, and is compiled into a [`ValidationRule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationSpec {
	pub required: bool,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub min_length: Option<usize>,
	pub max_length: Option<usize>,
	pub pattern: Option<String>,
	pub message: Option<String>,
	pub when: Option<ConditionalRule>,
	pub async_url: Option<String>,
	/// Custom expression; carried as data only
	pub expression: Option<String>,
}

impl ValidationSpec {
	/// Whether the spec carries no constraint at all
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

/// Compiled rule set of a single field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
	pub required: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_length: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_length: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<Pattern>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditional: Option<ConditionalRule>,
	#[serde(default, rename = "async", skip_serializing_if = "Option::is_none")]
	pub async_validation: Option<AsyncValidation>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expression: Option<String>,
}

impl ValidationRule {
	/// Compiles a declarative spec for `field`
	///
	/// An invalid `pattern` is dropped under [`Leniency::Lenient`] and reported
	/// as [`MetadataError::InvalidAnnotation`] under [`Leniency::Strict`].
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::settings::Leniency;
	/// use crudmeta_core::validation::{ValidationRule, ValidationSpec};
	///
	/// let spec = ValidationSpec {
	///     required: true,
	///     min_length: Some(3),
	///     pattern: Some("^[a-z]+$".to_string()),
	///     ..Default::default()
	/// };
	/// let rule = ValidationRule::compile("slug", &spec, Leniency::Lenient).unwrap();
	/// assert!(rule.required);
	/// assert_eq!(rule.pattern.unwrap().as_str(), "^[a-z]+$");
	/// ```
	pub fn compile(field: &str, spec: &ValidationSpec, leniency: Leniency) -> Result<Self> {
		let pattern = match spec.pattern.as_deref() {
			Some(source) => match Pattern::new(source) {
				Ok(pattern) => Some(pattern),
				Err(err) if leniency.is_lenient() => {
					tracing::warn!(field, pattern = source, %err, "dropping invalid validation pattern");
					None
				}
				Err(err) => {
					return Err(MetadataError::InvalidAnnotation {
						field: field.to_string(),
						reason: format!("invalid pattern '{}': {}", source, err),
					});
				}
			},
			None => None,
		};

		Ok(Self {
			required: spec.required,
			min: spec.min,
			max: spec.max,
			min_length: spec.min_length,
			max_length: spec.max_length,
			pattern,
			message: spec.message.clone(),
			conditional: spec.when.clone(),
			async_validation: spec
				.async_url
				.clone()
				.map(|url| AsyncValidation { url }),
			expression: spec.expression.clone(),
		})
	}

	/// Validates `value` of `field` against the rule set
	///
	/// `record` is the enclosing record, consulted by the conditional rule. A
	/// conditional rule in a rule set makes the field required while the
	/// condition holds; it only governs blank values. A non-blank value is
	/// checked against bounds, lengths and the pattern whether or not the
	/// condition holds. The rule's `message`, when set, replaces every default
	/// message.
	pub fn validate(
		&self,
		field: &str,
		value: &Value,
		record: &Map<String, Value>,
	) -> std::result::Result<(), FieldError> {
		if is_blank(value) {
			if self.required {
				return Err(self.error(
					field,
					FieldErrorKind::Required,
					format!("{} is required", field),
				));
			}
			if let Some(rule) = &self.conditional
				&& rule.evaluate(record) == ConditionOutcome::Holds
			{
				let message = rule
					.message
					.clone()
					.or_else(|| self.message.clone())
					.unwrap_or_else(|| format!("{} is required when {}", field, rule.describe()));
				return Err(FieldError::new(field, FieldErrorKind::Conditional, message));
			}
			return Ok(());
		}

		if let Some(number) = numeric_value(value) {
			if let Some(min) = self.min
				&& number < min
			{
				return Err(self.error(
					field,
					FieldErrorKind::MinValue,
					format!("{} must be at least {}", field, min),
				));
			}
			if let Some(max) = self.max
				&& number > max
			{
				return Err(self.error(
					field,
					FieldErrorKind::MaxValue,
					format!("{} must be at most {}", field, max),
				));
			}
		}

		if let Some(length) = length_of(value) {
			if let Some(min_length) = self.min_length
				&& length < min_length
			{
				return Err(self.error(
					field,
					FieldErrorKind::MinLength,
					format!("{} must have at least {} characters", field, min_length),
				));
			}
			if let Some(max_length) = self.max_length
				&& length > max_length
			{
				return Err(self.error(
					field,
					FieldErrorKind::MaxLength,
					format!("{} must have at most {} characters", field, max_length),
				));
			}
		}

		if let (Some(pattern), Value::String(text)) = (&self.pattern, value)
			&& !pattern.is_match(text)
		{
			return Err(self.error(
				field,
				FieldErrorKind::Pattern,
				format!("{} does not match pattern {}", field, pattern.as_str()),
			));
		}

		Ok(())
	}

	fn error(&self, field: &str, kind: FieldErrorKind, default: String) -> FieldError {
		FieldError::new(field, kind, self.message.clone().unwrap_or(default))
	}
}

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

fn numeric_value(value: &Value) -> Option<f64> {
	match value {
		Value::Number(_) => as_number(value),
		_ => None,
	}
}

fn length_of(value: &Value) -> Option<usize> {
	match value {
		Value::String(s) => Some(s.chars().count()),
		Value::Array(items) => Some(items.len()),
		_ => None,
	}
}
