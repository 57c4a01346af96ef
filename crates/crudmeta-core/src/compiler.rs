//! Metadata assembly
//!
//! [`MetadataCompiler`] runs the extraction pipeline over a record type and
//! composes the results into one [`ResourceMetadataDocument`]:
//!
//! ```text
//! TypeDescriptor ─┬─ extract_fields ──── (json fields) extract_nested_schema
//!                 │        │
//!                 │        └─ option overrides: validation, permissions
//!                 └─ extract_relations
//!                          │
//!                          ▼
//!              ResourceMetadataDocument
//! ```
//!
//! Compilation is a pure, synchronous pass. Nothing is cached; callers that
//! compile per request should memoize documents by resource name.

use crate::document::{ResourceMetadataDocument, ResourceOptions};
use crate::error::{MetadataError, Result};
use crate::fields::{FieldDescriptor, extract_fields, tolerate};
use crate::introspection::{Introspect, TypeDescriptor};
use crate::relations::extract_relations;
use crate::settings::MetadataSettings;
use crate::validation::ValidationRule;
use heck::ToTitleCase;
use std::collections::HashSet;

/// Compiles record types into resource metadata documents
#[derive(Debug, Clone, Default)]
pub struct MetadataCompiler {
	settings: MetadataSettings,
}

impl MetadataCompiler {
	pub fn new(settings: MetadataSettings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &MetadataSettings {
		&self.settings
	}

	/// Compiles the metadata of `T`
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::compiler::MetadataCompiler;
	/// use crudmeta_core::document::ResourceOptions;
	/// use crudmeta_core::introspection::{FieldDef, Introspect, TypeDescriptor};
	///
	/// struct Book;
	///
	/// impl Introspect for Book {
	///     fn describe() -> TypeDescriptor {
	///         TypeDescriptor::record(
	///             "Book",
	///             vec![
	///                 FieldDef::of::<String>("Title").tag("crud", "required;searchable"),
	///                 FieldDef::of::<f64>("Price").tag("crud", "min=0"),
	///             ],
	///         )
	///     }
	/// }
	///
	/// let doc = MetadataCompiler::default()
	///     .compile::<Book>(ResourceOptions::new("books"))
	///     .unwrap();
	/// assert_eq!(doc.label, "Books");
	/// assert_eq!(doc.searchable_fields, vec!["title"]);
	/// assert_eq!(doc.required_fields, vec!["title"]);
	/// assert_eq!(doc.field("price").unwrap().validation.as_ref().unwrap().min, Some(0.0));
	/// ```
	pub fn compile<T: Introspect + ?Sized>(
		&self,
		options: ResourceOptions,
	) -> Result<ResourceMetadataDocument> {
		self.compile_descriptor(&T::describe(), options)
	}

	/// Compiles the metadata of an already described type
	pub fn compile_descriptor(
		&self,
		descriptor: &TypeDescriptor,
		options: ResourceOptions,
	) -> Result<ResourceMetadataDocument> {
		let resource = options.name.clone();

		let mut fields = extract_fields(descriptor, &self.settings)?;
		let mut seen = HashSet::new();
		for field in &fields {
			if !seen.insert(field.name.as_str()) {
				return Err(MetadataError::DuplicateField {
					resource,
					field: field.name.clone(),
				});
			}
		}
		self.apply_overrides(&mut fields, &options)?;

		let relations = extract_relations(descriptor, &self.settings)?;
		let mut seen = HashSet::new();
		for relation in &relations {
			if !seen.insert(relation.name.as_str()) {
				return Err(MetadataError::DuplicateRelation {
					resource,
					relation: relation.name.clone(),
				});
			}
		}

		let names_where = |keep: fn(&FieldDescriptor) -> bool| -> Vec<String> {
			fields
				.iter()
				.filter(|field| keep(field))
				.map(|field| field.name.clone())
				.collect()
		};
		let searchable_fields = names_where(|field| field.searchable);
		let filterable_fields = names_where(|field| field.filterable);
		let sortable_fields = names_where(|field| field.sortable);
		let required_fields = names_where(|field| field.required);

		tracing::debug!(
			resource = %resource,
			record = descriptor.name(),
			fields = fields.len(),
			relations = relations.len(),
			"compiled resource metadata"
		);

		Ok(ResourceMetadataDocument {
			label: options
				.label
				.unwrap_or_else(|| resource.to_title_case()),
			name: resource,
			icon: options.icon,
			operations: options
				.operations
				.unwrap_or_else(|| self.settings.default_operations.clone()),
			fields,
			relations,
			default_sort: options.default_sort,
			filters: options.filters,
			searchable_fields,
			filterable_fields,
			sortable_fields,
			required_fields,
			permissions: options.permissions,
			access_policy: self.settings.access_policy,
		})
	}

	fn apply_overrides(&self, fields: &mut [FieldDescriptor], options: &ResourceOptions) -> Result<()> {
		let leniency = self.settings.leniency;

		for (name, spec) in &options.field_validation {
			match fields.iter_mut().find(|field| &field.name == name) {
				Some(field) => {
					let rule = ValidationRule::compile(name, spec, leniency)?;
					field.required = rule.required;
					field.validation = Some(rule);
				}
				None => tolerate(leniency, name, "validation override for unknown field".to_string())?,
			}
		}

		for (name, permissions) in &options.field_permissions {
			match fields.iter_mut().find(|field| &field.name == name) {
				Some(field) => field.permissions = Some(permissions.clone()),
				None => tolerate(leniency, name, "permission override for unknown field".to_string())?,
			}
		}

		Ok(())
	}
}
