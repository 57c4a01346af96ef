//! Rules conditioned on a sibling field
//!
//! A [`ConditionalRule`] names a dependent field of the enclosing record, an
//! operator and a comparison value. Evaluation never fails: a dependent field
//! that cannot be found, or a numeric comparison whose operands cannot be
//! coerced to numbers, yields [`ConditionOutcome::Skipped`] and the guarded
//! validation does not run.
//!
//! # Examples
//!
//! ```
//! use crudmeta_core::validation::{ConditionOperator, ConditionOutcome, ConditionalRule};
//! use serde_json::json;
//!
//! let rule = ConditionalRule::new("status", ConditionOperator::Eq, json!("active"));
//! let record = json!({"status": "active"});
//!
//! assert_eq!(rule.evaluate(record.as_object().unwrap()), ConditionOutcome::Holds);
//! ```

use super::errors::{FieldError, FieldErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a conditional rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
	Eq,
	Neq,
	Gt,
	Lt,
	Gte,
	Lte,
	Contains,
	StartsWith,
	EndsWith,
}

impl ConditionOperator {
	/// Whether both operands are compared as numbers
	pub fn is_numeric(self) -> bool {
		matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "eq",
			Self::Neq => "neq",
			Self::Gt => "gt",
			Self::Lt => "lt",
			Self::Gte => "gte",
			Self::Lte => "lte",
			Self::Contains => "contains",
			Self::StartsWith => "startsWith",
			Self::EndsWith => "endsWith",
		}
	}
}

impl fmt::Display for ConditionOperator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned for an unrecognised operator name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown condition operator '{0}'")]
pub struct UnknownOperator(pub String);

impl FromStr for ConditionOperator {
	type Err = UnknownOperator;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"eq" => Ok(Self::Eq),
			"neq" | "ne" => Ok(Self::Neq),
			"gt" => Ok(Self::Gt),
			"lt" => Ok(Self::Lt),
			"gte" => Ok(Self::Gte),
			"lte" => Ok(Self::Lte),
			"contains" => Ok(Self::Contains),
			"startsWith" | "starts_with" => Ok(Self::StartsWith),
			"endsWith" | "ends_with" => Ok(Self::EndsWith),
			other => Err(UnknownOperator(other.to_string())),
		}
	}
}

/// Why a condition was not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The dependent field is absent from the record
	UnresolvedField,
	/// A numeric operator was given operands that are not numbers
	Uncoercible,
}

/// Result of evaluating a condition against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
	Holds,
	NotHolds,
	Skipped(SkipReason),
}

impl ConditionOutcome {
	pub fn holds(self) -> bool {
		matches!(self, Self::Holds)
	}
}

/// Condition on a sibling field of the enclosing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
	/// Dependent field name
	pub field: String,
	pub operator: ConditionOperator,
	/// Comparison value
	pub value: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ConditionalRule {
	pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
		Self {
			field: field.into(),
			operator,
			value,
			message: None,
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	/// Parses the annotation form `field:operator:value`
	///
	/// Returns `None` when any of the three parts is missing or the operator is
	/// unknown.
	pub fn parse(raw: &str) -> Option<Self> {
		let mut parts = raw.splitn(3, ':');
		let field = parts.next()?.trim();
		let operator = parts.next()?.trim().parse().ok()?;
		let value = parts.next()?.trim();
		if field.is_empty() {
			return None;
		}
		Some(Self::new(field, operator, Value::String(value.to_string())))
	}

	/// Evaluates the condition against the enclosing record
	pub fn evaluate(&self, record: &Map<String, Value>) -> ConditionOutcome {
		let Some(current) = record.get(&self.field) else {
			tracing::trace!(field = %self.field, "conditional rule skipped: dependent field absent");
			return ConditionOutcome::Skipped(SkipReason::UnresolvedField);
		};

		let holds = if self.operator.is_numeric() {
			let (Some(left), Some(right)) = (as_number(current), as_number(&self.value)) else {
				return ConditionOutcome::Skipped(SkipReason::Uncoercible);
			};
			match self.operator {
				ConditionOperator::Gt => left > right,
				ConditionOperator::Lt => left < right,
				ConditionOperator::Gte => left >= right,
				_ => left <= right,
			}
		} else {
			let left = display_value(current);
			let right = display_value(&self.value);
			match self.operator {
				ConditionOperator::Eq => left == right,
				ConditionOperator::Neq => left != right,
				ConditionOperator::Contains => left.contains(right.as_str()),
				ConditionOperator::StartsWith => left.starts_with(right.as_str()),
				_ => left.ends_with(right.as_str()),
			}
		};

		if holds {
			ConditionOutcome::Holds
		} else {
			ConditionOutcome::NotHolds
		}
	}

	pub(crate) fn describe(&self) -> String {
		format!(
			"{} {} {}",
			self.field,
			self.operator,
			display_value(&self.value)
		)
	}
}

/// Coerces a JSON value to a number; strings are parsed
pub(crate) fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

/// String representation used by equality and substring operators
pub(crate) fn display_value(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		other => other.to_string(),
	}
}

/// Validation function wrapped by a [`ConditionalValidator`]
pub type ValueCheck = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Applies a validation function only when its condition holds
///
/// # Examples
///
/// ```
/// use crudmeta_core::validation::{ConditionOperator, ConditionalRule, ConditionalValidator};
/// use serde_json::json;
///
/// let validator = ConditionalValidator::new(
///     ConditionalRule::new("kind", ConditionOperator::Eq, json!("company")),
/// )
/// .check(|value| match value.as_str() {
///     Some(vat) if vat.len() == 10 => Ok(()),
///     _ => Err("VAT number must have 10 characters".to_string()),
/// });
///
/// let company = json!({"kind": "company", "vat": "123"});
/// let person = json!({"kind": "person", "vat": "123"});
///
/// assert!(validator.validate("vat", &json!("123"), company.as_object().unwrap()).is_err());
/// assert!(validator.validate("vat", &json!("123"), person.as_object().unwrap()).is_ok());
/// ```
pub struct ConditionalValidator {
	rule: ConditionalRule,
	check: Option<ValueCheck>,
}

impl ConditionalValidator {
	pub fn new(rule: ConditionalRule) -> Self {
		Self { rule, check: None }
	}

	/// Sets the wrapped validation function
	pub fn check<F>(mut self, check: F) -> Self
	where
		F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.check = Some(Box::new(check));
		self
	}

	pub fn rule(&self) -> &ConditionalRule {
		&self.rule
	}

	/// Runs the wrapped function when the condition holds
	///
	/// The rule's own message, when set, replaces the message of the wrapped
	/// function.
	pub fn validate(
		&self,
		field: &str,
		value: &Value,
		record: &Map<String, Value>,
	) -> Result<(), FieldError> {
		if !self.rule.evaluate(record).holds() {
			return Ok(());
		}
		let Some(check) = &self.check else {
			return Ok(());
		};
		check(value).map_err(|message| {
			FieldError::new(
				field,
				FieldErrorKind::Conditional,
				self.rule.message.clone().unwrap_or(message),
			)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn record(value: Value) -> Map<String, Value> {
		value.as_object().cloned().unwrap()
	}

	#[rstest]
	#[case::eq_string(ConditionOperator::Eq, json!("active"), json!("active"), ConditionOutcome::Holds)]
	#[case::eq_number_vs_string(ConditionOperator::Eq, json!(5), json!("5"), ConditionOutcome::Holds)]
	#[case::neq(ConditionOperator::Neq, json!("a"), json!("b"), ConditionOutcome::Holds)]
	#[case::gt(ConditionOperator::Gt, json!(10), json!("5"), ConditionOutcome::Holds)]
	#[case::lt_false(ConditionOperator::Lt, json!(10), json!(5), ConditionOutcome::NotHolds)]
	#[case::gte_equal(ConditionOperator::Gte, json!("5.0"), json!(5), ConditionOutcome::Holds)]
	#[case::lte(ConditionOperator::Lte, json!(4), json!(5), ConditionOutcome::Holds)]
	#[case::uncoercible(ConditionOperator::Gt, json!("many"), json!(5), ConditionOutcome::Skipped(SkipReason::Uncoercible))]
	#[case::bool_not_numeric(ConditionOperator::Gt, json!(true), json!(0), ConditionOutcome::Skipped(SkipReason::Uncoercible))]
	#[case::contains(ConditionOperator::Contains, json!("premium-plan"), json!("premium"), ConditionOutcome::Holds)]
	#[case::starts_with(ConditionOperator::StartsWith, json!("admin_joe"), json!("admin_"), ConditionOutcome::Holds)]
	#[case::ends_with(ConditionOperator::EndsWith, json!("report.pdf"), json!(".csv"), ConditionOutcome::NotHolds)]
	fn test_evaluate(
		#[case] operator: ConditionOperator,
		#[case] current: Value,
		#[case] expected_value: Value,
		#[case] outcome: ConditionOutcome,
	) {
		// Arrange
		let rule = ConditionalRule::new("dep", operator, expected_value);
		let record = record(json!({ "dep": current }));

		// Act & Assert
		assert_eq!(rule.evaluate(&record), outcome);
	}

	#[rstest]
	fn test_missing_dependent_field_is_skipped() {
		let rule = ConditionalRule::new("plan", ConditionOperator::Eq, json!("pro"));

		let outcome = rule.evaluate(&record(json!({"name": "x"})));

		assert_eq!(outcome, ConditionOutcome::Skipped(SkipReason::UnresolvedField));
	}

	#[rstest]
	fn test_parse_annotation_form() {
		let rule = ConditionalRule::parse("age:gte:18").unwrap();

		assert_eq!(rule.field, "age");
		assert_eq!(rule.operator, ConditionOperator::Gte);
		assert_eq!(rule.value, json!("18"));
	}

	#[rstest]
	#[case::missing_value("age:gte")]
	#[case::unknown_operator("age:between:1")]
	#[case::empty_field(":eq:1")]
	fn test_parse_rejects_malformed(#[case] raw: &str) {
		assert!(ConditionalRule::parse(raw).is_none());
	}

	#[rstest]
	fn test_rule_message_replaces_wrapped_message() {
		// Arrange
		let validator = ConditionalValidator::new(
			ConditionalRule::new("country", ConditionOperator::Eq, json!("DE"))
				.with_message("German addresses need a postal code"),
		)
		.check(|_| Err("wrapped failure".to_string()));
		let record = record(json!({"country": "DE"}));

		// Act
		let err = validator.validate("postal_code", &Value::Null, &record).unwrap_err();

		// Assert
		assert_eq!(err.kind, FieldErrorKind::Conditional);
		assert_eq!(err.message, "German addresses need a postal code");
	}

	#[rstest]
	fn test_wrapped_message_surfaces_without_rule_message() {
		let validator = ConditionalValidator::new(ConditionalRule::new(
			"country",
			ConditionOperator::Eq,
			json!("DE"),
		))
		.check(|_| Err("wrapped failure".to_string()));

		let err = validator
			.validate("postal_code", &Value::Null, &record(json!({"country": "DE"})))
			.unwrap_err();

		assert_eq!(err.message, "wrapped failure");
	}

	#[rstest]
	fn test_without_check_always_passes() {
		let validator = ConditionalValidator::new(ConditionalRule::new(
			"country",
			ConditionOperator::Eq,
			json!("DE"),
		));

		let result = validator.validate("postal_code", &Value::Null, &record(json!({"country": "DE"})));

		assert!(result.is_ok());
	}
}
