//! Presentation-neutral projection of a rule set
//!
//! Form renderers consume [`UiRule`]s rather than [`ValidationRule`]s. The
//! projection is a pure function of the rule set and is ordered:
//! required, minLength, maxLength, pattern, min, max, conditional, async.

use super::conditional::ConditionalRule;
use super::rule::ValidationRule;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a projected rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiRuleKind {
	Required,
	MinLength,
	MaxLength,
	Pattern,
	Min,
	Max,
	Conditional,
	Async,
}

/// When a renderer should run the rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
	Blur,
	Change,
	Submit,
}

/// A single projected rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiRule {
	#[serde(rename = "type")]
	pub kind: UiRuleKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub trigger: Trigger,
	/// Dependent field triple of a conditional rule
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dependency: Option<ConditionalRule>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl UiRule {
	fn new(kind: UiRuleKind, trigger: Trigger, message: Option<String>) -> Self {
		Self {
			kind,
			value: None,
			pattern: None,
			message,
			trigger,
			dependency: None,
			url: None,
		}
	}

	fn with_value(mut self, value: impl Into<Value>) -> Self {
		self.value = Some(value.into());
		self
	}
}

impl ValidationRule {
	/// Projects the rule set onto generic UI rules
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::settings::Leniency;
	/// use crudmeta_core::validation::{Trigger, UiRuleKind, ValidationRule, ValidationSpec};
	///
	/// let spec = ValidationSpec {
	///     required: true,
	///     max_length: Some(50),
	///     ..Default::default()
	/// };
	/// let rules = ValidationRule::compile("name", &spec, Leniency::Lenient)
	///     .unwrap()
	///     .ui_rules();
	///
	/// assert_eq!(rules.len(), 2);
	/// assert_eq!(rules[0].kind, UiRuleKind::Required);
	/// assert_eq!(rules[1].kind, UiRuleKind::MaxLength);
	/// assert_eq!(rules[1].trigger, Trigger::Blur);
	/// ```
	pub fn ui_rules(&self) -> Vec<UiRule> {
		let message = || self.message.clone();
		let mut rules = Vec::new();

		if self.required {
			rules.push(UiRule::new(UiRuleKind::Required, Trigger::Change, message()));
		}
		if let Some(min_length) = self.min_length {
			rules.push(UiRule::new(UiRuleKind::MinLength, Trigger::Blur, message()).with_value(min_length));
		}
		if let Some(max_length) = self.max_length {
			rules.push(UiRule::new(UiRuleKind::MaxLength, Trigger::Blur, message()).with_value(max_length));
		}
		if let Some(pattern) = &self.pattern {
			let mut rule = UiRule::new(UiRuleKind::Pattern, Trigger::Blur, message());
			rule.pattern = Some(pattern.as_str().to_string());
			rules.push(rule);
		}
		if let Some(min) = self.min {
			rules.push(UiRule::new(UiRuleKind::Min, Trigger::Blur, message()).with_value(min));
		}
		if let Some(max) = self.max {
			rules.push(UiRule::new(UiRuleKind::Max, Trigger::Blur, message()).with_value(max));
		}
		if let Some(conditional) = &self.conditional {
			let mut rule = UiRule::new(
				UiRuleKind::Conditional,
				Trigger::Change,
				conditional.message.clone().or_else(message),
			);
			rule.dependency = Some(conditional.clone());
			rules.push(rule);
		}
		if let Some(remote) = &self.async_validation {
			let mut rule = UiRule::new(UiRuleKind::Async, Trigger::Submit, message());
			rule.url = Some(remote.url.clone());
			rules.push(rule);
		}

		rules
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::settings::Leniency;
	use crate::validation::{ConditionOperator, ValidationSpec};
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_full_projection_order_and_triggers() {
		// Arrange
		let spec = ValidationSpec {
			required: true,
			min: Some(1.0),
			max: Some(9.0),
			min_length: Some(2),
			max_length: Some(8),
			pattern: Some("^[0-9]+$".to_string()),
			message: None,
			when: Some(ConditionalRule::new("kind", ConditionOperator::Eq, json!("b2b"))),
			async_url: Some("/api/unique".to_string()),
			expression: Some("value != 0".to_string()),
		};
		let rule = ValidationRule::compile("code", &spec, Leniency::Lenient).unwrap();

		// Act
		let projected = rule.ui_rules();

		// Assert
		let kinds: Vec<UiRuleKind> = projected.iter().map(|r| r.kind).collect();
		assert_eq!(
			kinds,
			vec![
				UiRuleKind::Required,
				UiRuleKind::MinLength,
				UiRuleKind::MaxLength,
				UiRuleKind::Pattern,
				UiRuleKind::Min,
				UiRuleKind::Max,
				UiRuleKind::Conditional,
				UiRuleKind::Async,
			]
		);
		assert_eq!(projected[0].trigger, Trigger::Change);
		assert_eq!(projected[3].pattern.as_deref(), Some("^[0-9]+$"));
		assert_eq!(projected[6].dependency.as_ref().unwrap().field, "kind");
		assert_eq!(projected[7].trigger, Trigger::Submit);
		assert_eq!(projected[7].url.as_deref(), Some("/api/unique"));
	}

	#[rstest]
	fn test_empty_rule_projects_nothing() {
		assert!(ValidationRule::default().ui_rules().is_empty());
	}

	#[rstest]
	fn test_projection_serializes_type_key() {
		let rule = ValidationRule {
			min_length: Some(3),
			message: Some("too short".to_string()),
			..Default::default()
		};

		let value = serde_json::to_value(rule.ui_rules()).unwrap();

		assert_eq!(
			value,
			json!([{"type": "minLength", "value": 3, "message": "too short", "trigger": "blur"}])
		);
	}
}
