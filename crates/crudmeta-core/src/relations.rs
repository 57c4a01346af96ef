//! Relation extraction and inference
//!
//! An explicit `relation` annotation always wins:
//!
//! ```text
//! resource=posts;type=one_to_many;field=id;reference=author_id;include;min=1
//! ```
//!
//! Without one, the declared shape decides:
//!
//! - a sequence of records (or of pointers to records) is one-to-many,
//!   targeting the element type
//! - a single record (or pointer to one) is one-to-one
//! - anything else, including the date/time primitive, is no relation
//!
//! Shape alone cannot tell many-to-one from one-to-one, so inference always
//! yields [`RelationKind::INFERENCE_DEFAULT`]. Declare `type=many_to_one`
//! explicitly where that matters.

use crate::annotation::{FlagSet, last_value, parse_annotation};
use crate::error::{MetadataError, Result};
use crate::fields::FieldCategory;
use crate::introspection::{FieldDef, TypeDescriptor, TypeShape};
use crate::settings::{Leniency, MetadataSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cardinality of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
	OneToOne,
	OneToMany,
	ManyToOne,
	ManyToMany,
}

impl RelationKind {
	/// Kind inferred for a single record-valued field without annotation
	pub const INFERENCE_DEFAULT: RelationKind = RelationKind::OneToOne;

	/// Whether the relation holds a sequence of references
	pub fn is_to_many(self) -> bool {
		matches!(self, Self::OneToMany | Self::ManyToMany)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::OneToOne => "one_to_one",
			Self::OneToMany => "one_to_many",
			Self::ManyToOne => "many_to_one",
			Self::ManyToMany => "many_to_many",
		}
	}
}

impl fmt::Display for RelationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RelationKind {
	type Err = String;

	/// Accepts snake case and camel case spellings
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"one_to_one" | "oneToOne" => Ok(Self::OneToOne),
			"one_to_many" | "oneToMany" => Ok(Self::OneToMany),
			"many_to_one" | "manyToOne" => Ok(Self::ManyToOne),
			"many_to_many" | "manyToMany" => Ok(Self::ManyToMany),
			other => Err(format!("unknown relation type '{}'", other)),
		}
	}
}

/// Join table of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotTable {
	pub table: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub local_field: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub foreign_field: Option<String>,
}

/// Compiled description of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDescriptor {
	/// Relation name, the serialized name of the carrying field
	pub name: String,
	#[serde(rename = "type")]
	pub kind: RelationKind,
	/// Target resource name
	pub resource: String,
	/// Local field holding the reference
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	/// Field on the target resource the reference points at
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reference_field: Option<String>,
	/// Loaded by default when reading the owning resource
	pub include: bool,
	pub required: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_items: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_items: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pivot: Option<PivotTable>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub on_delete: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub on_update: Option<String>,
	pub cascade: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl RelationDescriptor {
	/// Creates a relation with no field mapping and no constraints
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::relations::{RelationDescriptor, RelationKind};
	///
	/// let relation = RelationDescriptor::new("tags", RelationKind::ManyToMany, "tags")
	///     .with_reference("id")
	///     .with_bounds(Some(1), None);
	/// assert!(relation.kind.is_to_many());
	/// assert_eq!(relation.reference_field.as_deref(), Some("id"));
	/// ```
	pub fn new(name: impl Into<String>, kind: RelationKind, resource: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind,
			resource: resource.into(),
			field: None,
			reference_field: None,
			include: false,
			required: false,
			min_items: None,
			max_items: None,
			pivot: None,
			on_delete: None,
			on_update: None,
			cascade: false,
			message: None,
		}
	}

	pub fn with_reference(mut self, reference_field: impl Into<String>) -> Self {
		self.reference_field = Some(reference_field.into());
		self
	}

	pub fn with_field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	pub fn with_bounds(mut self, min_items: Option<usize>, max_items: Option<usize>) -> Self {
		self.min_items = min_items;
		self.max_items = max_items;
		self
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

/// Extracts the relations of a record type in declaration order
///
/// # Examples
///
/// ```
/// use crudmeta_core::introspection::{FieldDef, TypeDescriptor};
/// use crudmeta_core::relations::{RelationKind, extract_relations};
/// use crudmeta_core::settings::MetadataSettings;
///
/// let tag = TypeDescriptor::record("Tag", vec![FieldDef::of::<String>("label")]);
/// let post = TypeDescriptor::record(
///     "Post",
///     vec![
///         FieldDef::new("Tags", TypeDescriptor::sequence(tag.clone())),
///         FieldDef::new("Cover", TypeDescriptor::pointer(tag))
///             .tag("relation", "resource=images;type=many_to_one;reference=id"),
///     ],
/// );
///
/// let relations = extract_relations(&post, &MetadataSettings::default()).unwrap();
/// assert_eq!(relations[0].kind, RelationKind::OneToMany);
/// assert_eq!(relations[0].resource, "Tag");
/// assert_eq!(relations[1].kind, RelationKind::ManyToOne);
/// assert_eq!(relations[1].resource, "images");
/// ```
pub fn extract_relations(
	descriptor: &TypeDescriptor,
	settings: &MetadataSettings,
) -> Result<Vec<RelationDescriptor>> {
	let mut relations = Vec::new();
	for def in descriptor.record_fields()? {
		if !def.is_exported() {
			continue;
		}
		let Some(name) = def.serialized_name() else {
			continue;
		};
		if is_embedded_json(&def, settings) {
			continue;
		}

		let relation = match def.annotation(&settings.tags.relation) {
			Some(raw) => parse_relation(&def, name, raw, settings.leniency)?,
			None => infer_relation(def.ty(), name),
		};
		relations.extend(relation);
	}
	Ok(relations)
}

fn is_embedded_json(def: &FieldDef, settings: &MetadataSettings) -> bool {
	def.annotation(&settings.tags.field)
		.map(parse_annotation)
		.and_then(|tokens| last_value(&tokens, "type").map(|raw| raw == FieldCategory::Json.as_str()))
		.unwrap_or(false)
}

/// Shape-based inference for a field without an explicit annotation
pub fn infer_relation(ty: &TypeDescriptor, name: impl Into<String>) -> Option<RelationDescriptor> {
	let ty = ty.deref();
	match ty.shape() {
		TypeShape::Sequence(element) if element.is_record() => Some(RelationDescriptor::new(
			name,
			RelationKind::OneToMany,
			element.deref().name(),
		)),
		TypeShape::Record(_) => Some(RelationDescriptor::new(
			name,
			RelationKind::INFERENCE_DEFAULT,
			ty.name(),
		)),
		_ => None,
	}
}

fn parse_relation(
	def: &FieldDef,
	name: String,
	raw: &str,
	leniency: Leniency,
) -> Result<Option<RelationDescriptor>> {
	let tokens = parse_annotation(raw);
	let flags = FlagSet::from_tokens(&tokens);
	let field = def.name();

	let resource = last_value(&tokens, "resource").filter(|value| !value.is_empty());
	let kind = last_value(&tokens, "type").map(str::parse::<RelationKind>);
	let (resource, kind) = match (resource, kind) {
		(Some(resource), Some(Ok(kind))) => (resource, kind),
		(_, Some(Err(reason))) => return skip(leniency, field, reason),
		(None, _) => return skip(leniency, field, "missing resource".to_string()),
		(_, None) => return skip(leniency, field, "missing type".to_string()),
	};

	let mut relation = RelationDescriptor::new(name, kind, resource);
	relation.field = last_value(&tokens, "field").map(str::to_string);
	relation.reference_field = last_value(&tokens, "reference").map(str::to_string);
	relation.include = flags.get_or("include", false);
	relation.required = flags.get_or("required", false);
	relation.cascade = flags.get_or("cascade", false);
	relation.on_delete = last_value(&tokens, "on_delete").map(str::to_string);
	relation.on_update = last_value(&tokens, "on_update").map(str::to_string);
	relation.message = last_value(&tokens, "message").map(str::to_string);

	for key in ["min", "max"] {
		let Some(raw) = last_value(&tokens, key) else {
			continue;
		};
		match raw.parse::<usize>() {
			Ok(bound) if key == "min" => relation.min_items = Some(bound),
			Ok(bound) => relation.max_items = Some(bound),
			Err(_) if leniency.is_lenient() => {
				tracing::warn!(field, key, value = raw, "ignoring malformed relation bound");
			}
			Err(_) => {
				return Err(MetadataError::InvalidRelation {
					field: field.to_string(),
					reason: format!("{}={} is not a count", key, raw),
				});
			}
		}
	}

	if let Some(table) = last_value(&tokens, "pivot") {
		relation.pivot = Some(PivotTable {
			table: table.to_string(),
			local_field: last_value(&tokens, "pivot_local").map(str::to_string),
			foreign_field: last_value(&tokens, "pivot_foreign").map(str::to_string),
		});
	}

	Ok(Some(relation))
}

fn skip(leniency: Leniency, field: &str, reason: String) -> Result<Option<RelationDescriptor>> {
	if leniency.is_lenient() {
		tracing::warn!(field, %reason, "skipping malformed relation annotation");
		Ok(None)
	} else {
		Err(MetadataError::InvalidRelation {
			field: field.to_string(),
			reason,
		})
	}
}
