//! # crudmeta core
//!
//! Model introspection and resource metadata compilation.
//!
//! Record types describe themselves through [`introspection::Introspect`]; the
//! [`compiler::MetadataCompiler`] turns such a description into a
//! [`document::ResourceMetadataDocument`] that generic CRUD tooling and
//! generated UIs consume.
//!
//! ## Pipeline
//!
//! - **annotation**: the `;`-separated per-field mini-language
//! - **fields**: field descriptors, category inference, annotation overrides
//! - **relations**: explicit relation annotations and shape-based inference
//! - **schema**: dotted-path property trees of embedded composite fields
//! - **validation**: rule compilation, local validation, UI rule projection
//! - **permissions**: role/operation access checks, field filtering
//! - **compiler**: assembly of the document
//!
//! ## Leniency
//!
//! Malformed annotations and absent permission data are tolerated by default.
//! Both behaviours are named policies in [`settings`]:
//! [`settings::Leniency`] and [`settings::AccessPolicy`].

pub mod annotation;
pub mod compiler;
pub mod document;
pub mod error;
pub mod fields;
pub mod introspection;
pub mod permissions;
pub mod relations;
pub mod schema;
pub mod settings;
pub mod validation;

pub use compiler::MetadataCompiler;
pub use document::{FilterDescriptor, ResourceMetadataDocument, ResourceOptions, SortDirection, SortSpec};
pub use error::{MetadataError, Result};
pub use fields::{FieldCategory, FieldDescriptor};
pub use introspection::{FieldDef, Introspect, TypeDescriptor, TypeShape};
pub use permissions::{PermissionScoped, PermissionSet};
pub use relations::{RelationDescriptor, RelationKind};
pub use schema::{JsonNodeType, JsonPropertyNode};
pub use settings::{AccessPolicy, Leniency, MetadataSettings};
