//! Nested schema extraction for composite fields
//!
//! A field holding embedded structured data (a record or a key-value map
//! stored as JSON) is described by a tree of [`JsonPropertyNode`]s. Every node
//! carries its dotted path from the root field:
//!
//! ```text
//! config            object
//! ├── config.email  object
//! │   ├── config.email.host  string
//! │   └── config.email.port  number
//! └── config.active boolean
//! ```
//!
//! Sequences become `array` nodes without element recursion. The walk stops
//! descending into a record type that already appears on the current path, so
//! self-referencing types produce a finite tree.

use crate::error::{MetadataError, Result};
use crate::fields::ParsedField;
use crate::introspection::{FieldDef, TypeDescriptor, TypeShape};
use crate::settings::MetadataSettings;
use crate::validation::ValidationRule;
use serde::{Deserialize, Serialize};

/// Type category of a nested property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonNodeType {
	String,
	Number,
	Boolean,
	Object,
	Array,
}

impl JsonNodeType {
	/// Classifies a declared type; pointers are stripped first
	pub fn infer(ty: &TypeDescriptor) -> Self {
		match ty.deref().shape() {
			TypeShape::Bool => Self::Boolean,
			TypeShape::Integer | TypeShape::Float => Self::Number,
			TypeShape::Record(_) | TypeShape::Map { .. } => Self::Object,
			TypeShape::Sequence(_) => Self::Array,
			_ => Self::String,
		}
	}
}

/// One property of a nested schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPropertyNode {
	/// Dotted path from the root field
	pub path: String,
	#[serde(rename = "type")]
	pub node_type: JsonNodeType,
	pub read_only: bool,
	pub hidden: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub validation: Option<ValidationRule>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<JsonPropertyNode>,
}

impl JsonPropertyNode {
	/// Last segment of the path
	pub fn segment(&self) -> &str {
		self.path.rsplit('.').next().unwrap_or(&self.path)
	}

	/// Finds a descendant (or this node) by full path
	pub fn find(&self, path: &str) -> Option<&JsonPropertyNode> {
		if self.path == path {
			return Some(self);
		}
		if !path.starts_with(&self.path) {
			return None;
		}
		self.children.iter().find_map(|child| child.find(path))
	}

	/// Every path of the tree in depth-first order
	pub fn paths(&self) -> Vec<&str> {
		let mut paths = vec![self.path.as_str()];
		for child in &self.children {
			paths.extend(child.paths());
		}
		paths
	}
}

/// Builds the schema tree of a composite field
///
/// The root node is named after the field's serialized name. Fields whose type
/// is neither a record nor a map are rejected with
/// [`MetadataError::NotComposite`].
///
/// # Examples
///
/// ```
/// use crudmeta_core::introspection::{FieldDef, TypeDescriptor};
/// use crudmeta_core::schema::{JsonNodeType, extract_nested_schema};
/// use crudmeta_core::settings::MetadataSettings;
///
/// let config = TypeDescriptor::record(
///     "Config",
///     vec![FieldDef::of::<bool>("Active"), FieldDef::of::<u16>("Port")],
/// );
/// let field = FieldDef::new("Config", config);
///
/// let root = extract_nested_schema(&field, &MetadataSettings::default()).unwrap();
/// assert_eq!(root.paths(), vec!["config", "config.active", "config.port"]);
/// assert_eq!(root.find("config.port").unwrap().node_type, JsonNodeType::Number);
/// ```
pub fn extract_nested_schema(field: &FieldDef, settings: &MetadataSettings) -> Result<JsonPropertyNode> {
	let ty = field.ty().deref();
	if !matches!(ty.shape(), TypeShape::Record(_) | TypeShape::Map { .. }) {
		return Err(MetadataError::NotComposite {
			field: field.name().to_string(),
			type_name: field.ty().name().to_string(),
		});
	}

	let path = field
		.serialized_name()
		.unwrap_or_else(|| field.name().to_string());
	let mut stack = Vec::new();
	let children = walk_children(ty, &path, settings, &mut stack)?;

	Ok(JsonPropertyNode {
		path,
		node_type: JsonNodeType::Object,
		read_only: false,
		hidden: false,
		validation: None,
		children,
	})
}

fn walk_children(
	ty: &TypeDescriptor,
	parent: &str,
	settings: &MetadataSettings,
	stack: &mut Vec<String>,
) -> Result<Vec<JsonPropertyNode>> {
	let record = match ty.shape() {
		TypeShape::Record(_) => ty,
		TypeShape::Map { value, .. } if value.is_record() => value.deref(),
		_ => return Ok(Vec::new()),
	};

	if stack.iter().any(|seen| seen == record.name()) {
		tracing::debug!(path = parent, record = record.name(), "stopping at recursive record");
		return Ok(Vec::new());
	}
	stack.push(record.name().to_string());

	let mut children = Vec::new();
	for def in record.record_fields()? {
		if !def.is_exported() {
			continue;
		}
		let Some(segment) = def.serialized_name() else {
			continue;
		};
		let path = format!("{}.{}", parent, segment);
		if children.iter().any(|child: &JsonPropertyNode| child.path == path) {
			return Err(MetadataError::DuplicateField {
				resource: record.name().to_string(),
				field: path,
			});
		}

		let parsed = ParsedField::parse(&def, settings)?;
		let node_type = JsonNodeType::infer(def.ty());
		let grandchildren = if node_type == JsonNodeType::Object {
			walk_children(def.ty().deref(), &path, settings, stack)?
		} else {
			Vec::new()
		};

		children.push(JsonPropertyNode {
			path,
			node_type,
			read_only: parsed.flags.get_or("readonly", false),
			hidden: parsed.flags.get_or("hidden", false),
			validation: parsed.validation,
			children: grandchildren,
		});
	}

	stack.pop();
	Ok(children)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::introspection::Introspect;
	use rstest::rstest;
	use std::collections::HashMap;

	struct EmailConfig;

	impl Introspect for EmailConfig {
		fn describe() -> TypeDescriptor {
			TypeDescriptor::record(
				"EmailConfig",
				vec![
					FieldDef::of::<String>("Host").tag("crud", "required"),
					FieldDef::of::<i32>("Port").tag("crud", "min=1;max=65535"),
				],
			)
		}
	}

	struct Config;

	impl Introspect for Config {
		fn describe() -> TypeDescriptor {
			TypeDescriptor::record(
				"Config",
				vec![
					FieldDef::of::<EmailConfig>("Email"),
					FieldDef::of::<bool>("Active").tag("crud", "readonly"),
				],
			)
		}
	}

	struct Node;

	impl Introspect for Node {
		fn describe() -> TypeDescriptor {
			TypeDescriptor::deferred_record("Node", || {
				vec![
					FieldDef::of::<String>("Label"),
					FieldDef::of::<Option<Box<Node>>>("Next"),
					FieldDef::of::<Vec<String>>("Tags"),
				]
			})
		}
	}

	#[rstest]
	fn test_config_scenario_paths_and_types() {
		// Arrange
		let field = FieldDef::of::<Config>("Config");

		// Act
		let root = extract_nested_schema(&field, &MetadataSettings::default()).unwrap();

		// Assert
		assert_eq!(
			root.paths(),
			vec![
				"config",
				"config.email",
				"config.email.host",
				"config.email.port",
				"config.active",
			]
		);
		let types: Vec<JsonNodeType> = ["config.email", "config.email.host", "config.email.port", "config.active"]
			.iter()
			.map(|path| root.find(path).unwrap().node_type)
			.collect();
		assert_eq!(
			types,
			vec![
				JsonNodeType::Object,
				JsonNodeType::String,
				JsonNodeType::Number,
				JsonNodeType::Boolean,
			]
		);
	}

	#[rstest]
	fn test_nested_annotations_are_compiled() {
		let root = extract_nested_schema(&FieldDef::of::<Config>("Config"), &MetadataSettings::default()).unwrap();

		let host = root.find("config.email.host").unwrap();
		let port = root.find("config.email.port").unwrap();
		assert!(host.validation.as_ref().unwrap().required);
		assert_eq!(port.validation.as_ref().unwrap().max, Some(65535.0));
		assert!(root.find("config.active").unwrap().read_only);
	}

	#[rstest]
	#[case::datetime_is_string(TypeDescriptor::of::<chrono::NaiveDateTime>(), JsonNodeType::String)]
	#[case::optional_float(TypeDescriptor::of::<Option<f32>>(), JsonNodeType::Number)]
	#[case::sequence(TypeDescriptor::of::<Vec<i64>>(), JsonNodeType::Array)]
	#[case::map(TypeDescriptor::of::<HashMap<String, i64>>(), JsonNodeType::Object)]
	#[case::any(TypeDescriptor::of::<serde_json::Value>(), JsonNodeType::String)]
	fn test_node_type_inference(#[case] ty: TypeDescriptor, #[case] expected: JsonNodeType) {
		assert_eq!(JsonNodeType::infer(&ty), expected);
	}

	#[rstest]
	fn test_map_of_records_recurses_into_value() {
		let field = FieldDef::of::<HashMap<String, EmailConfig>>("Mailers");

		let root = extract_nested_schema(&field, &MetadataSettings::default()).unwrap();

		assert_eq!(root.paths(), vec!["mailers", "mailers.host", "mailers.port"]);
	}

	#[rstest]
	fn test_map_of_scalars_has_no_children() {
		let field = FieldDef::of::<HashMap<String, String>>("Labels");

		let root = extract_nested_schema(&field, &MetadataSettings::default()).unwrap();

		assert_eq!(root.node_type, JsonNodeType::Object);
		assert!(root.children.is_empty());
	}

	#[rstest]
	fn test_recursive_record_terminates() {
		let root = extract_nested_schema(&FieldDef::of::<Node>("Head"), &MetadataSettings::default()).unwrap();

		assert_eq!(root.paths(), vec!["head", "head.label", "head.next", "head.tags"]);
		assert_eq!(root.find("head.tags").unwrap().node_type, JsonNodeType::Array);
		assert!(root.find("head.next").unwrap().children.is_empty());
	}

	#[rstest]
	fn test_scalar_field_is_rejected() {
		let result = extract_nested_schema(&FieldDef::of::<String>("Title"), &MetadataSettings::default());

		assert!(matches!(result, Err(MetadataError::NotComposite { .. })));
	}
}
