//! Extension point for asynchronous and expression-based validation
//!
//! Rule sets carry an async-validation URL and a custom expression as data
//! only. Evaluating them is delegated to an injected [`RuleEvaluator`]; when
//! none is supplied both hooks pass.

use super::errors::{FieldError, FieldErrorKind};
use super::rule::ValidationRule;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Evaluates the advisory hooks of a rule set
///
/// Implementations decide the network contract behind `url` and the language
/// of `expression`. An `Err` carries the message reported to the caller.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
	async fn check_remote(&self, url: &str, field: &str, value: &Value) -> Result<(), String>;

	async fn check_expression(
		&self,
		expression: &str,
		field: &str,
		value: &Value,
		record: &Map<String, Value>,
	) -> Result<(), String>;
}

impl ValidationRule {
	/// Runs the local checks, then the async and expression hooks
	///
	/// Hooks run only when the local checks pass. The rule-level message
	/// replaces the evaluator's message when set.
	pub async fn validate_with(
		&self,
		field: &str,
		value: &Value,
		record: &Map<String, Value>,
		evaluator: Option<&dyn RuleEvaluator>,
	) -> Result<(), FieldError> {
		self.validate(field, value, record)?;

		let Some(evaluator) = evaluator else {
			return Ok(());
		};

		if let Some(remote) = &self.async_validation {
			evaluator
				.check_remote(&remote.url, field, value)
				.await
				.map_err(|message| self.hook_error(field, FieldErrorKind::Remote, message))?;
		}
		if let Some(expression) = &self.expression {
			evaluator
				.check_expression(expression, field, value, record)
				.await
				.map_err(|message| self.hook_error(field, FieldErrorKind::Expression, message))?;
		}
		Ok(())
	}

	fn hook_error(&self, field: &str, kind: FieldErrorKind, message: String) -> FieldError {
		FieldError::new(field, kind, self.message.clone().unwrap_or(message))
	}
}
