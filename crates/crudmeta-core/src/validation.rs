//! Validation rule compiler
//!
//! A declarative [`ValidationSpec`] compiles into a [`ValidationRule`], which
//! serves two consumers: local record validation
//! ([`ValidationRule::validate`]) and form renderers
//! ([`ValidationRule::ui_rules`]).

mod conditional;
mod errors;
mod evaluator;
mod projection;
mod rule;

pub use conditional::{
	ConditionOperator, ConditionOutcome, ConditionalRule, ConditionalValidator, SkipReason,
	UnknownOperator, ValueCheck,
};
pub use errors::{FieldError, FieldErrorKind};
pub use evaluator::RuleEvaluator;
pub use projection::{Trigger, UiRule, UiRuleKind};
pub use rule::{AsyncValidation, Pattern, ValidationRule, ValidationSpec};
