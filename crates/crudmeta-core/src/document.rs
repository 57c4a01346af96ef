//! The compiled resource metadata document

use crate::fields::{FieldDescriptor, validate_record};
use crate::permissions::{PermissionSet, allowed, filter_fields, redact_record};
use crate::relations::RelationDescriptor;
use crate::settings::AccessPolicy;
use crate::validation::{FieldError, ValidationSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	#[default]
	Asc,
	Desc,
}

/// Default ordering of a resource listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
	pub field: String,
	#[serde(default)]
	pub direction: SortDirection,
}

impl SortSpec {
	pub fn asc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Asc,
		}
	}

	pub fn desc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Desc,
		}
	}
}

/// A filter offered by a resource listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
	pub field: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Supported comparison operators
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub operators: Vec<String>,
	/// Fixed choices, if any
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub options: Vec<String>,
}

impl FilterDescriptor {
	pub fn new(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			label: None,
			operators: Vec::new(),
			options: Vec::new(),
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_operators<I, S>(mut self, operators: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.operators = operators.into_iter().map(Into::into).collect();
		self
	}
}

/// Registration-time options of a resource
///
/// # Examples
///
/// ```
/// use crudmeta_core::document::{ResourceOptions, SortSpec};
/// use crudmeta_core::permissions::PermissionSet;
///
/// let options = ResourceOptions::new("blog_posts")
///     .icon("file-text")
///     .operations(["list", "read"])
///     .default_sort(SortSpec::desc("created_at"))
///     .permissions(PermissionSet::new().grant("delete", ["admin"]));
/// assert_eq!(options.name, "blog_posts");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceOptions {
	pub name: String,
	/// Display label; the name in title case when absent
	pub label: Option<String>,
	pub icon: Option<String>,
	/// Allowed operations; the settings' defaults when absent
	pub operations: Option<Vec<String>>,
	pub default_sort: Option<SortSpec>,
	pub filters: Vec<FilterDescriptor>,
	pub permissions: Option<PermissionSet>,
	/// Validation replacing the annotation-derived rule set, by field name
	pub field_validation: BTreeMap<String, ValidationSpec>,
	/// Permissions replacing the annotation-derived ones, by field name
	pub field_permissions: BTreeMap<String, PermissionSet>,
}

impl ResourceOptions {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn icon(mut self, icon: impl Into<String>) -> Self {
		self.icon = Some(icon.into());
		self
	}

	pub fn operations<I, S>(mut self, operations: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.operations = Some(operations.into_iter().map(Into::into).collect());
		self
	}

	pub fn default_sort(mut self, sort: SortSpec) -> Self {
		self.default_sort = Some(sort);
		self
	}

	pub fn filter(mut self, filter: FilterDescriptor) -> Self {
		self.filters.push(filter);
		self
	}

	pub fn permissions(mut self, permissions: PermissionSet) -> Self {
		self.permissions = Some(permissions);
		self
	}

	pub fn field_validation(mut self, field: impl Into<String>, spec: ValidationSpec) -> Self {
		self.field_validation.insert(field.into(), spec);
		self
	}

	pub fn field_permissions(mut self, field: impl Into<String>, permissions: PermissionSet) -> Self {
		self.field_permissions.insert(field.into(), permissions);
		self
	}
}

/// Fully compiled, serializable description of a resource
///
/// Documents are immutable once compiled; a changed record type or annotation
/// is picked up by compiling a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadataDocument {
	pub name: String,
	pub label: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	pub operations: Vec<String>,
	pub fields: Vec<FieldDescriptor>,
	pub relations: Vec<RelationDescriptor>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default_sort: Option<SortSpec>,
	pub filters: Vec<FilterDescriptor>,
	pub searchable_fields: Vec<String>,
	pub filterable_fields: Vec<String>,
	pub sortable_fields: Vec<String>,
	pub required_fields: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permissions: Option<PermissionSet>,
	/// How absent permission data is read by [`Self::allows`],
	/// [`Self::visible_fields`] and [`Self::redact`]
	#[serde(default)]
	pub access_policy: AccessPolicy,
}

impl ResourceMetadataDocument {
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|field| field.name == name)
	}

	pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
		self.relations.iter().find(|relation| relation.name == name)
	}

	/// Whether the resource lists `operation`
	pub fn supports(&self, operation: &str) -> bool {
		self.operations.iter().any(|op| op == operation)
	}

	/// Resource-level permission check
	pub fn allows<S: AsRef<str>>(&self, operation: &str, roles: &[S]) -> bool {
		allowed(self.permissions.as_ref(), operation, roles, self.access_policy)
	}

	/// Fields `roles` may access for `operation`, excluding hidden fields
	pub fn visible_fields<S: AsRef<str>>(&self, operation: &str, roles: &[S]) -> Vec<&FieldDescriptor> {
		filter_fields(&self.fields, operation, roles, self.access_policy)
			.into_iter()
			.filter(|field| !field.hidden)
			.collect()
	}

	/// Removes the keys of `record` that `roles` may not access
	pub fn redact<S: AsRef<str>>(
		&self,
		record: &mut Map<String, Value>,
		operation: &str,
		roles: &[S],
	) -> Vec<String> {
		redact_record(&self.fields, record, operation, roles, self.access_policy)
	}

	/// Validates a record against every field's rule set
	pub fn validate_record(&self, record: &Map<String, Value>) -> Vec<FieldError> {
		validate_record(&self.fields, record)
	}
}
