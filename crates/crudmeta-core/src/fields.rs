//! Field extraction
//!
//! Walks the exported fields of a record type and turns each into a
//! [`FieldDescriptor`]. Defaults are `filterable = true`, `sortable = true`,
//! `searchable = false` and `required = false`; the `crud` annotation then
//! overrides them token by token.
//!
//! Recognised `crud` tokens:
//!
//! | Token | Effect |
//! |-------|--------|
//! | `required`, `searchable`, `filterable`, `sortable`, `readonly`, `hidden` | flags, negatable with `!` |
//! | `min=`, `max=` | numeric bounds on numbers, length bounds on strings |
//! | `pattern=`, `message=` | regex constraint and custom error message |
//! | `type=` | category override |
//! | `options=a\|b\|c` | choices of a select field |
//! | `when=field:op:value`, `when_message=` | conditional requirement |
//! | `async=`, `expr=` | advisory async-validation URL and custom expression |
//! | `label=`, `width=`, `fixed=`, ... | presentation hints, passed through |

use crate::annotation::{AnnotationToken, FlagSet, last_value, parse_annotation};
use crate::error::{MetadataError, Result};
use crate::introspection::{FieldDef, TypeDescriptor, TypeShape};
use crate::permissions::{PermissionScoped, PermissionSet, parse_permissions};
use crate::schema::{JsonPropertyNode, extract_nested_schema};
use crate::settings::{Leniency, MetadataSettings};
use crate::validation::{ConditionalRule, FieldError, ValidationRule, ValidationSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Presentation hints copied into [`FieldDescriptor::hints`] unchanged
pub const HINT_KEYS: &[&str] = &[
	"label",
	"width",
	"fixed",
	"align",
	"placeholder",
	"help",
	"format",
	"component",
	"icon",
];

const FLAG_KEYS: &[&str] = &[
	"required",
	"searchable",
	"filterable",
	"sortable",
	"readonly",
	"hidden",
];

const PAIR_KEYS: &[&str] = &[
	"min",
	"max",
	"pattern",
	"message",
	"type",
	"options",
	"when",
	"when_message",
	"async",
	"expr",
];

/// Semantic category of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
	String,
	Number,
	Boolean,
	Date,
	Json,
	File,
	Richtext,
	Select,
	Computed,
	Relation,
}

impl FieldCategory {
	/// Infers the category from a declared type
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::fields::FieldCategory;
	/// use crudmeta_core::introspection::TypeDescriptor;
	///
	/// assert_eq!(FieldCategory::infer(&TypeDescriptor::of::<Option<i32>>()), FieldCategory::Number);
	/// assert_eq!(FieldCategory::infer(&TypeDescriptor::of::<Vec<String>>()), FieldCategory::Json);
	/// assert_eq!(FieldCategory::infer(&TypeDescriptor::of::<String>()), FieldCategory::String);
	/// ```
	pub fn infer(ty: &TypeDescriptor) -> Self {
		match ty.deref().shape() {
			TypeShape::Bool => Self::Boolean,
			TypeShape::Integer | TypeShape::Float => Self::Number,
			TypeShape::DateTime => Self::Date,
			TypeShape::Bytes => Self::File,
			TypeShape::Any | TypeShape::Map { .. } => Self::Json,
			TypeShape::Sequence(element) if element.is_record() => Self::Relation,
			TypeShape::Sequence(_) => Self::Json,
			TypeShape::Record(_) => Self::Relation,
			TypeShape::String | TypeShape::Pointer(_) => Self::String,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::String => "string",
			Self::Number => "number",
			Self::Boolean => "boolean",
			Self::Date => "date",
			Self::Json => "json",
			Self::File => "file",
			Self::Richtext => "richtext",
			Self::Select => "select",
			Self::Computed => "computed",
			Self::Relation => "relation",
		}
	}
}

impl fmt::Display for FieldCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for FieldCategory {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"string" => Ok(Self::String),
			"number" => Ok(Self::Number),
			"boolean" => Ok(Self::Boolean),
			"date" => Ok(Self::Date),
			"json" => Ok(Self::Json),
			"file" => Ok(Self::File),
			"richtext" => Ok(Self::Richtext),
			"select" => Ok(Self::Select),
			"computed" => Ok(Self::Computed),
			"relation" => Ok(Self::Relation),
			other => Err(format!("unknown field type '{}'", other)),
		}
	}
}

/// Compiled description of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
	/// Serialized field name
	pub name: String,
	/// Declared type name
	pub declared_type: String,
	#[serde(rename = "type")]
	pub category: FieldCategory,
	pub read_only: bool,
	pub hidden: bool,
	pub required: bool,
	pub searchable: bool,
	pub filterable: bool,
	pub sortable: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub validation: Option<ValidationRule>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permissions: Option<PermissionSet>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nested_schema: Option<JsonPropertyNode>,
	/// Opaque presentation hints
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub hints: BTreeMap<String, String>,
	/// Choices of a select field
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub options: Vec<String>,
}

impl PermissionScoped for FieldDescriptor {
	fn scoped_name(&self) -> &str {
		&self.name
	}

	fn permissions(&self) -> Option<&PermissionSet> {
		self.permissions.as_ref()
	}
}

/// The `crud` annotation of one field after interpretation
#[derive(Debug, Clone)]
pub(crate) struct ParsedField {
	pub(crate) flags: FlagSet,
	pub(crate) category: Option<FieldCategory>,
	pub(crate) validation: Option<ValidationRule>,
	pub(crate) options: Vec<String>,
	pub(crate) hints: BTreeMap<String, String>,
}

impl ParsedField {
	/// Interprets the `crud` annotation of `def`
	pub(crate) fn parse(def: &FieldDef, settings: &MetadataSettings) -> Result<Self> {
		let field = def.name();
		let leniency = settings.leniency;
		let tokens = def
			.annotation(&settings.tags.field)
			.map(parse_annotation)
			.unwrap_or_default();
		let flags = FlagSet::from_tokens(&tokens);

		let mut spec = ValidationSpec {
			required: flags.get_or("required", false),
			..Default::default()
		};

		for (key, apply_min) in [("min", true), ("max", false)] {
			let Some(raw) = last_value(&tokens, key) else {
				continue;
			};
			if def.ty().is_numeric() {
				match raw.parse::<f64>() {
					Ok(bound) if bound.is_finite() && apply_min => spec.min = Some(bound),
					Ok(bound) if bound.is_finite() => spec.max = Some(bound),
					_ => tolerate(leniency, field, format!("{}={} is not a finite number", key, raw))?,
				}
			} else if def.ty().is_string_like() {
				match raw.parse::<usize>() {
					Ok(bound) if apply_min => spec.min_length = Some(bound),
					Ok(bound) => spec.max_length = Some(bound),
					Err(_) => tolerate(leniency, field, format!("{}={} is not a length", key, raw))?,
				}
			} else {
				tracing::trace!(field, key, "bound ignored on non-numeric, non-string field");
			}
		}

		spec.pattern = last_value(&tokens, "pattern").map(str::to_string);
		spec.message = last_value(&tokens, "message").map(str::to_string);
		spec.async_url = last_value(&tokens, "async").map(str::to_string);
		spec.expression = last_value(&tokens, "expr").map(str::to_string);

		if let Some(raw) = last_value(&tokens, "when") {
			match ConditionalRule::parse(raw) {
				Some(mut rule) => {
					rule.message = last_value(&tokens, "when_message").map(str::to_string);
					spec.when = Some(rule);
				}
				None => tolerate(leniency, field, format!("malformed condition '{}'", raw))?,
			}
		}

		let category = match last_value(&tokens, "type") {
			Some(raw) => match raw.parse::<FieldCategory>() {
				Ok(category) => Some(category),
				Err(reason) => {
					tolerate(leniency, field, reason)?;
					None
				}
			},
			None => None,
		};

		let options = last_value(&tokens, "options")
			.map(|raw| {
				raw.split('|')
					.map(str::trim)
					.filter(|choice| !choice.is_empty())
					.map(str::to_string)
					.collect()
			})
			.unwrap_or_default();

		let mut hints = BTreeMap::new();
		for token in &tokens {
			match token {
				AnnotationToken::Pair { key, value } if HINT_KEYS.contains(&key.as_str()) => {
					hints.insert(key.clone(), value.clone());
				}
				AnnotationToken::Flag { name, negated } if HINT_KEYS.contains(&name.as_str()) => {
					hints.insert(name.clone(), (!negated).to_string());
				}
				AnnotationToken::Pair { key, .. } if !PAIR_KEYS.contains(&key.as_str()) => {
					tracing::trace!(field, token = %key, "ignoring unknown annotation pair");
				}
				AnnotationToken::Flag { name, .. } if !FLAG_KEYS.contains(&name.as_str()) => {
					tracing::trace!(field, token = %name, "ignoring unknown annotation flag");
				}
				_ => {}
			}
		}

		let validation = if spec.is_empty() {
			None
		} else {
			Some(ValidationRule::compile(field, &spec, leniency)?)
		};

		Ok(Self {
			flags,
			category,
			validation,
			options,
			hints,
		})
	}
}

/// Applies the leniency policy to a malformed annotation value
pub(crate) fn tolerate(leniency: Leniency, field: &str, reason: String) -> Result<()> {
	if leniency.is_lenient() {
		tracing::warn!(field, %reason, "ignoring malformed annotation");
		Ok(())
	} else {
		Err(MetadataError::InvalidAnnotation {
			field: field.to_string(),
			reason,
		})
	}
}

/// Extracts the field descriptors of a record type in declaration order
///
/// Unexported fields and fields serialized as `-` are skipped. Fields of the
/// `json` category whose type is a record or a map carry a nested schema.
///
/// # Examples
///
/// ```
/// use crudmeta_core::fields::{FieldCategory, extract_fields};
/// use crudmeta_core::introspection::{FieldDef, TypeDescriptor};
/// use crudmeta_core::settings::MetadataSettings;
///
/// let user = TypeDescriptor::record(
///     "User",
///     vec![
///         FieldDef::of::<String>("Name").tag("crud", "required;searchable"),
///         FieldDef::of::<u32>("Age"),
///     ],
/// );
///
/// let fields = extract_fields(&user, &MetadataSettings::default()).unwrap();
/// assert_eq!(fields[0].name, "name");
/// assert!(fields[0].required && fields[0].searchable);
/// assert_eq!(fields[1].category, FieldCategory::Number);
/// assert!(fields[1].filterable && fields[1].sortable);
/// ```
pub fn extract_fields(
	descriptor: &TypeDescriptor,
	settings: &MetadataSettings,
) -> Result<Vec<FieldDescriptor>> {
	let mut fields = Vec::new();
	for def in descriptor.record_fields()? {
		if !def.is_exported() {
			continue;
		}
		let Some(name) = def.serialized_name() else {
			continue;
		};
		fields.push(build_descriptor(&def, name, settings)?);
	}
	Ok(fields)
}

fn build_descriptor(
	def: &FieldDef,
	name: String,
	settings: &MetadataSettings,
) -> Result<FieldDescriptor> {
	let parsed = ParsedField::parse(def, settings)?;
	let category = parsed
		.category
		.unwrap_or_else(|| FieldCategory::infer(def.ty()));

	let permissions = def
		.annotation(&settings.tags.permission)
		.map(parse_permissions)
		.filter(|perms| !perms.is_empty());

	let nested_schema = match def.ty().deref().shape() {
		TypeShape::Record(_) | TypeShape::Map { .. } if category == FieldCategory::Json => {
			Some(extract_nested_schema(def, settings)?)
		}
		_ => None,
	};

	Ok(FieldDescriptor {
		name,
		declared_type: def.ty().name().to_string(),
		category,
		read_only: parsed.flags.get_or("readonly", false),
		hidden: parsed.flags.get_or("hidden", false),
		required: parsed.flags.get_or("required", false),
		searchable: parsed.flags.get_or("searchable", false),
		filterable: parsed.flags.get_or("filterable", true),
		sortable: parsed.flags.get_or("sortable", true),
		validation: parsed.validation,
		permissions,
		nested_schema,
		hints: parsed.hints,
		options: parsed.options,
	})
}

/// Validates every field of `record` that carries a rule set
///
/// Missing keys are validated as `null`. One error is reported per failing
/// field, in field order.
pub fn validate_record(fields: &[FieldDescriptor], record: &Map<String, Value>) -> Vec<FieldError> {
	fields
		.iter()
		.filter_map(|field| {
			let rule = field.validation.as_ref()?;
			let value = record.get(&field.name).unwrap_or(&Value::Null);
			rule.validate(&field.name, value, record).err()
		})
		.collect()
}
