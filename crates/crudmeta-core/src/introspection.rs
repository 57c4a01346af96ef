//! Type introspection capability
//!
//! Rust has no runtime reflection, so record types describe themselves through
//! the [`Introspect`] trait. A [`TypeDescriptor`] exposes what the metadata
//! pipeline needs to know about a type: its declared name, its shape, and for
//! records the ordered list of fields together with their per-field annotation
//! strings (the analogue of struct tags).
//!
//! # Architecture
//!
//! ```text
//! impl Introspect for User      →  TypeDescriptor { name: "User", shape: Record }
//!   FieldDef::of::<String>(..)   →    FieldDef { name, ty, annotations }
//!   FieldDef::of::<Vec<Post>>(..)→    FieldDef { ty: Sequence(Post (deferred)) }
//! ```
//!
//! Record fields may be supplied lazily through a function pointer. This lets
//! `User` reference `Vec<Post>` while `Post` references `User` without the
//! description itself recursing forever.
//!
//! # Examples
//!
//! ```
//! use crudmeta_core::introspection::{FieldDef, Introspect, TypeDescriptor};
//!
//! struct Article {
//!     title: String,
//!     views: i64,
//! }
//!
//! impl Introspect for Article {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::deferred_record("Article", || {
//!             vec![
//!                 FieldDef::of::<String>("title").tag("crud", "required;searchable"),
//!                 FieldDef::of::<i64>("views").tag("crud", "readonly"),
//!             ]
//!         })
//!     }
//! }
//!
//! let descriptor = Article::describe();
//! assert!(descriptor.is_record());
//! assert_eq!(descriptor.record_fields().unwrap().len(), 2);
//! ```

use crate::error::{MetadataError, Result};
use heck::ToSnakeCase;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Annotation tag holding the serialized field name (`json=<name>` semantics)
pub const JSON_TAG: &str = "json";

/// Types that can describe their own shape to the metadata pipeline
pub trait Introspect {
	/// Returns the descriptor of this type
	fn describe() -> TypeDescriptor;
}

/// Structural shape of a described type
#[derive(Debug, Clone)]
pub enum TypeShape {
	Bool,
	Integer,
	Float,
	String,
	Bytes,
	/// The date/time primitive
	DateTime,
	/// Dynamically typed value (e.g. `serde_json::Value`)
	Any,
	Record(RecordFields),
	/// Optional or boxed indirection to another type
	Pointer(Box<TypeDescriptor>),
	Sequence(Box<TypeDescriptor>),
	Map {
		key: Box<TypeDescriptor>,
		value: Box<TypeDescriptor>,
	},
}

/// Field list of a record shape
#[derive(Clone)]
pub enum RecordFields {
	/// Fields known up front
	Inline(Arc<[FieldDef]>),
	/// Fields produced on demand
	Deferred(fn() -> Vec<FieldDef>),
}

impl RecordFields {
	fn resolve(&self) -> Vec<FieldDef> {
		match self {
			RecordFields::Inline(fields) => fields.to_vec(),
			RecordFields::Deferred(produce) => produce(),
		}
	}
}

impl fmt::Debug for RecordFields {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RecordFields::Inline(fields) => f
				.debug_list()
				.entries(fields.iter().map(|field| &field.name))
				.finish(),
			RecordFields::Deferred(_) => f.write_str("<deferred>"),
		}
	}
}

/// Description of a type as seen by the metadata pipeline
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
	name: String,
	shape: TypeShape,
}

impl TypeDescriptor {
	/// Creates a descriptor from a name and a shape
	pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
		Self {
			name: name.into(),
			shape,
		}
	}

	/// Returns the descriptor of `T`
	pub fn of<T: Introspect + ?Sized>() -> Self {
		T::describe()
	}

	/// Creates a record descriptor with an inline field list
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::introspection::{FieldDef, TypeDescriptor};
	///
	/// let email = TypeDescriptor::record(
	///     "EmailConfig",
	///     vec![
	///         FieldDef::of::<String>("host"),
	///         FieldDef::of::<u16>("port"),
	///     ],
	/// );
	/// assert_eq!(email.name(), "EmailConfig");
	/// assert!(email.is_record());
	/// ```
	pub fn record(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
		Self::new(name, TypeShape::Record(RecordFields::Inline(fields.into())))
	}

	/// Creates a record descriptor whose fields are produced lazily
	pub fn deferred_record(name: impl Into<String>, fields: fn() -> Vec<FieldDef>) -> Self {
		Self::new(name, TypeShape::Record(RecordFields::Deferred(fields)))
	}

	/// Creates a raw byte-buffer descriptor (file uploads, blobs)
	pub fn bytes() -> Self {
		Self::new("Vec<u8>", TypeShape::Bytes)
	}

	/// Creates an optional indirection to `inner`
	pub fn pointer(inner: TypeDescriptor) -> Self {
		Self::new(
			format!("Option<{}>", inner.name),
			TypeShape::Pointer(Box::new(inner)),
		)
	}

	/// Creates a sequence of `element`
	pub fn sequence(element: TypeDescriptor) -> Self {
		Self::new(
			format!("Vec<{}>", element.name),
			TypeShape::Sequence(Box::new(element)),
		)
	}

	/// Creates a string-keyed map of `value`
	pub fn map(value: TypeDescriptor) -> Self {
		Self::new(
			format!("HashMap<String, {}>", value.name),
			TypeShape::Map {
				key: Box::new(String::describe()),
				value: Box::new(value),
			},
		)
	}

	/// Declared type name (e.g. `"Vec<Post>"`)
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn shape(&self) -> &TypeShape {
		&self.shape
	}

	/// Strips every pointer indirection
	pub fn deref(&self) -> &TypeDescriptor {
		let mut current = self;
		while let TypeShape::Pointer(inner) = &current.shape {
			current = inner;
		}
		current
	}

	/// Whether this type is a pointer (optional) indirection
	pub fn is_pointer(&self) -> bool {
		matches!(self.shape, TypeShape::Pointer(_))
	}

	/// Whether the dereferenced type is a record
	pub fn is_record(&self) -> bool {
		matches!(self.deref().shape, TypeShape::Record(_))
	}

	/// Whether the dereferenced type is an integer or floating point number
	pub fn is_numeric(&self) -> bool {
		matches!(self.deref().shape, TypeShape::Integer | TypeShape::Float)
	}

	/// Whether the dereferenced type is textual
	pub fn is_string_like(&self) -> bool {
		matches!(self.deref().shape, TypeShape::String)
	}

	/// Whether the dereferenced type is the date/time primitive
	pub fn is_date_time(&self) -> bool {
		matches!(self.deref().shape, TypeShape::DateTime)
	}

	/// Element type of a (dereferenced) sequence
	pub fn element(&self) -> Option<&TypeDescriptor> {
		match &self.deref().shape {
			TypeShape::Sequence(element) => Some(element),
			_ => None,
		}
	}

	/// Value type of a (dereferenced) map
	pub fn map_value(&self) -> Option<&TypeDescriptor> {
		match &self.deref().shape {
			TypeShape::Map { value, .. } => Some(value),
			_ => None,
		}
	}

	/// Returns the ordered fields of a record type
	///
	/// Pointer indirections are stripped first. Any other shape is rejected
	/// with [`MetadataError::NotARecord`].
	pub fn record_fields(&self) -> Result<Vec<FieldDef>> {
		match &self.deref().shape {
			TypeShape::Record(fields) => Ok(fields.resolve()),
			_ => Err(MetadataError::NotARecord {
				type_name: self.name.clone(),
			}),
		}
	}
}

/// A single field of a record type
#[derive(Debug, Clone)]
pub struct FieldDef {
	name: String,
	ty: TypeDescriptor,
	exported: bool,
	annotations: BTreeMap<String, String>,
}

impl FieldDef {
	/// Creates an exported field with no annotations
	pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
		Self {
			name: name.into(),
			ty,
			exported: true,
			annotations: BTreeMap::new(),
		}
	}

	/// Creates a field whose type is described by `T`
	pub fn of<T: Introspect + ?Sized>(name: impl Into<String>) -> Self {
		Self::new(name, T::describe())
	}

	/// Attaches an annotation string under `key`, replacing any previous one
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::introspection::FieldDef;
	///
	/// let field = FieldDef::of::<String>("Email")
	///     .tag("crud", "required")
	///     .tag("json", "email_address");
	/// assert_eq!(field.annotation("crud"), Some("required"));
	/// assert_eq!(field.serialized_name().as_deref(), Some("email_address"));
	/// ```
	pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.annotations.insert(key.into(), value.into());
		self
	}

	/// Marks the field as not exported; extraction skips it
	pub fn private(mut self) -> Self {
		self.exported = false;
		self
	}

	/// Declared field name
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn ty(&self) -> &TypeDescriptor {
		&self.ty
	}

	pub fn is_exported(&self) -> bool {
		self.exported
	}

	/// Raw annotation string stored under `key`
	pub fn annotation(&self, key: &str) -> Option<&str> {
		self.annotations.get(key).map(String::as_str)
	}

	pub fn annotations(&self) -> &BTreeMap<String, String> {
		&self.annotations
	}

	/// Name the field is serialized under, `None` when it is skipped
	///
	/// An explicit `json` tag wins (options after a comma are ignored, `-`
	/// skips the field); otherwise the declared name in snake case.
	pub fn serialized_name(&self) -> Option<String> {
		match self.annotation(JSON_TAG) {
			Some(tag) => {
				let name = tag.split(',').next().unwrap_or_default().trim();
				match name {
					"-" => None,
					"" => Some(self.name.to_snake_case()),
					explicit => Some(explicit.to_string()),
				}
			}
			None => Some(self.name.to_snake_case()),
		}
	}
}

macro_rules! impl_introspect_scalar {
	($shape:ident => $($ty:ty),+ $(,)?) => {
		$(
			impl Introspect for $ty {
				fn describe() -> TypeDescriptor {
					TypeDescriptor::new(stringify!($ty), TypeShape::$shape)
				}
			}
		)+
	};
}

impl_introspect_scalar!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_introspect_scalar!(Float => f32, f64);
impl_introspect_scalar!(Bool => bool);
impl_introspect_scalar!(String => String, str, char);

impl Introspect for chrono::NaiveDate {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::new("NaiveDate", TypeShape::DateTime)
	}
}

impl Introspect for chrono::NaiveDateTime {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::new("NaiveDateTime", TypeShape::DateTime)
	}
}

impl<Tz: chrono::TimeZone> Introspect for chrono::DateTime<Tz> {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::new("DateTime", TypeShape::DateTime)
	}
}

impl Introspect for serde_json::Value {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::new("Value", TypeShape::Any)
	}
}

impl<T: Introspect> Introspect for Option<T> {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::pointer(T::describe())
	}
}

impl<T: Introspect + ?Sized> Introspect for Box<T> {
	fn describe() -> TypeDescriptor {
		let inner = T::describe();
		TypeDescriptor::new(
			format!("Box<{}>", inner.name),
			TypeShape::Pointer(Box::new(inner)),
		)
	}
}

impl<T: Introspect> Introspect for Vec<T> {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::sequence(T::describe())
	}
}

impl<V: Introspect, S> Introspect for HashMap<String, V, S> {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::map(V::describe())
	}
}

impl<V: Introspect> Introspect for BTreeMap<String, V> {
	fn describe() -> TypeDescriptor {
		let value = V::describe();
		TypeDescriptor::new(
			format!("BTreeMap<String, {}>", value.name),
			TypeShape::Map {
				key: Box::new(String::describe()),
				value: Box::new(value),
			},
		)
	}
}

impl Introspect for serde_json::Map<String, serde_json::Value> {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::new(
			"Map<String, Value>",
			TypeShape::Map {
				key: Box::new(String::describe()),
				value: Box::new(serde_json::Value::describe()),
			},
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Author;
	struct Post;

	impl Introspect for Author {
		fn describe() -> TypeDescriptor {
			TypeDescriptor::deferred_record("Author", || {
				vec![
					FieldDef::of::<String>("Name"),
					FieldDef::of::<Vec<Post>>("Posts"),
				]
			})
		}
	}

	impl Introspect for Post {
		fn describe() -> TypeDescriptor {
			TypeDescriptor::deferred_record("Post", || {
				vec![
					FieldDef::of::<String>("Title"),
					FieldDef::of::<Option<Author>>("Author"),
				]
			})
		}
	}

	#[rstest]
	#[case::integer(i64::describe(), "i64")]
	#[case::float(f32::describe(), "f32")]
	#[case::vec(Vec::<String>::describe(), "Vec<String>")]
	#[case::option(Option::<u8>::describe(), "Option<u8>")]
	#[case::map(HashMap::<String, bool>::describe(), "HashMap<String, bool>")]
	fn test_declared_type_names(#[case] descriptor: TypeDescriptor, #[case] expected: &str) {
		assert_eq!(descriptor.name(), expected);
	}

	#[rstest]
	fn test_mutually_recursive_records_describe_lazily() {
		// Arrange
		let author = Author::describe();

		// Act
		let fields = author.record_fields().unwrap();
		let post = fields[1].ty().element().unwrap();
		let post_fields = post.record_fields().unwrap();

		// Assert
		assert_eq!(post.name(), "Post");
		assert_eq!(post_fields[1].ty().deref().name(), "Author");
	}

	#[rstest]
	fn test_deref_strips_nested_pointers() {
		let descriptor = Option::<Box<i32>>::describe();

		assert!(descriptor.is_pointer());
		assert_eq!(descriptor.deref().name(), "i32");
		assert!(descriptor.is_numeric());
	}

	#[rstest]
	fn test_record_fields_rejects_scalars() {
		let result = String::describe().record_fields();

		assert_eq!(
			result.unwrap_err(),
			MetadataError::NotARecord {
				type_name: "String".to_string()
			}
		);
	}

	#[rstest]
	#[case::snake_from_pascal(FieldDef::of::<String>("CreatedBy"), Some("created_by"))]
	#[case::json_override(FieldDef::of::<String>("Name").tag("json", "full_name,omitempty"), Some("full_name"))]
	#[case::json_skip(FieldDef::of::<String>("Secret").tag("json", "-"), None)]
	#[case::json_options_only(FieldDef::of::<String>("Title").tag("json", ",omitempty"), Some("title"))]
	fn test_serialized_name(#[case] field: FieldDef, #[case] expected: Option<&str>) {
		assert_eq!(field.serialized_name().as_deref(), expected);
	}

	#[rstest]
	fn test_date_time_primitives() {
		assert!(chrono::NaiveDate::describe().is_date_time());
		assert!(chrono::DateTime::<chrono::Utc>::describe().is_date_time());
		assert!(!chrono::DateTime::<chrono::Utc>::describe().is_record());
	}
}
