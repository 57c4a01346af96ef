//! # crudmeta
//!
//! Resource metadata for generic CRUD tooling and generated UIs.
//!
//! crudmeta inspects an application's record types and compiles them into a
//! declarative [`ResourceMetadataDocument`]: field descriptors with semantic
//! categories, relation descriptors, nested schemas of embedded JSON fields,
//! validation rules with a UI projection, and role-based permissions. A
//! separate validator checks relation values of record instances against a
//! resource registry and a data store.
//!
//! HTTP routing, persistence and UI rendering are out of scope; they consume
//! the documents produced here.
//!
//! ## Feature Flags
//!
//! - `relations` (default): registry, data-store contract, relation
//!   consistency validation
//! - `testing`: in-memory data store
//!
//! ## Quick Example
//!
//! ```
//! use crudmeta::prelude::*;
//!
//! struct Article;
//!
//! impl Introspect for Article {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::record(
//!             "Article",
//!             vec![
//!                 FieldDef::of::<String>("Title").tag("crud", "required;min=3;searchable"),
//!                 FieldDef::of::<String>("Body").tag("crud", "type=richtext"),
//!                 FieldDef::of::<i64>("AuthorId")
//!                     .tag("relation", "resource=users;type=many_to_one;reference=id;required"),
//!             ],
//!         )
//!     }
//! }
//!
//! let doc = MetadataCompiler::default()
//!     .compile::<Article>(ResourceOptions::new("articles"))
//!     .unwrap();
//!
//! assert_eq!(doc.field("body").unwrap().category, FieldCategory::Richtext);
//! assert_eq!(doc.relation("author_id").unwrap().kind, RelationKind::ManyToOne);
//! ```

pub use crudmeta_core::{
	annotation, compiler, document, error, fields, introspection, permissions, relations, schema,
	settings, validation,
};

pub use crudmeta_core::{
	AccessPolicy, FieldCategory, FieldDef, FieldDescriptor, FilterDescriptor, Introspect,
	JsonNodeType, JsonPropertyNode, Leniency, MetadataCompiler, MetadataError, MetadataSettings,
	PermissionScoped, PermissionSet, RelationDescriptor, RelationKind, ResourceMetadataDocument,
	ResourceOptions, SortDirection, SortSpec, TypeDescriptor, TypeShape,
};

/// Registry, data-store contract and relation consistency validation
#[cfg(feature = "relations")]
pub use crudmeta_relations as integrity;

#[cfg(feature = "relations")]
pub use crudmeta_relations::{
	RecordStore, RegistryEntry, RelationError, RelationValidator, ResourceRegistry, StoreError,
};

#[cfg(feature = "testing")]
pub use crudmeta_relations::InMemoryStore;

/// Commonly used types
pub mod prelude {
	pub use crate::{
		AccessPolicy, FieldCategory, FieldDef, FieldDescriptor, Introspect, Leniency,
		MetadataCompiler, MetadataError, MetadataSettings, PermissionSet, RelationDescriptor,
		RelationKind, ResourceMetadataDocument, ResourceOptions, TypeDescriptor,
	};

	pub use crate::validation::{
		ConditionOperator, ConditionalRule, FieldError, RuleEvaluator, ValidationRule, ValidationSpec,
	};

	#[cfg(feature = "relations")]
	pub use crate::{RecordStore, RegistryEntry, RelationError, RelationValidator, ResourceRegistry};

	// External
	pub use async_trait::async_trait;
	pub use serde::{Deserialize, Serialize};
}
