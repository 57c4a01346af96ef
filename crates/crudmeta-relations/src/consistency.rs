//! Relation consistency validation
//!
//! Checks a populated record instance against its relation descriptors. Each
//! relation is driven by the value presented for it:
//!
//! ```text
//! null / missing ── required? ──► Required
//!        │
//! to-one ──► reference ──► store? ──► count(table, referenceField, ref) == 0 ──► NotFound
//!        │
//! to-many ─► sequence? ──► len < min ──► TooFew
//!                          len > max ──► TooMany
//!                          store? ──► per item as to-one, stop at first missing
//! ```
//!
//! The reference of an object value is its `referenceField` key; any other
//! value is the reference itself. Without a store only the structural checks
//! run. Queries are issued one at a time with no batching.

use crate::error::{RelationError, kind_of};
use crate::registry::ResourceRegistry;
use crate::store::RecordStore;
use crudmeta_core::relations::RelationDescriptor;
use serde::Serialize;
use serde_json::{Map, Value};

/// Validates relation values of record instances
///
/// # Examples
///
/// ```
/// use crudmeta_core::relations::{RelationDescriptor, RelationKind};
/// use crudmeta_relations::consistency::RelationValidator;
/// use crudmeta_relations::registry::ResourceRegistry;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = ResourceRegistry::new();
/// let validator = RelationValidator::new(&registry);
/// let tags = RelationDescriptor::new("tags", RelationKind::ManyToMany, "tags")
///     .with_bounds(Some(3), None);
///
/// let two = json!({"tags": [1, 2]});
/// let three = json!({"tags": [1, 2, 3]});
///
/// assert!(validator.validate(&two, std::slice::from_ref(&tags)).await.is_err());
/// assert!(validator.validate(&three, std::slice::from_ref(&tags)).await.is_ok());
/// # }
/// ```
pub struct RelationValidator<'a> {
	registry: &'a ResourceRegistry,
	store: Option<&'a dyn RecordStore>,
}

impl<'a> RelationValidator<'a> {
	/// Creates a validator that performs structural checks only
	pub fn new(registry: &'a ResourceRegistry) -> Self {
		Self {
			registry,
			store: None,
		}
	}

	/// Enables referential existence checks against `store`
	pub fn with_store(mut self, store: &'a dyn RecordStore) -> Self {
		self.store = Some(store);
		self
	}

	/// Validates every relation, stopping at the first violation
	pub async fn validate(&self, record: &Value, relations: &[RelationDescriptor]) -> Result<(), RelationError> {
		let record = as_record(record)?;
		for relation in relations {
			self.validate_relation(relation, presented_value(record, relation))
				.await?;
		}
		Ok(())
	}

	/// Validates every relation, collecting one error per failing relation
	pub async fn validate_all(
		&self,
		record: &Value,
		relations: &[RelationDescriptor],
	) -> Result<(), Vec<RelationError>> {
		let record = as_record(record).map_err(|err| vec![err])?;
		let mut errors = Vec::new();
		for relation in relations {
			if let Err(err) = self
				.validate_relation(relation, presented_value(record, relation))
				.await
			{
				errors.push(err);
			}
		}
		if errors.is_empty() { Ok(()) } else { Err(errors) }
	}

	/// Serializes `instance` and validates it
	pub async fn validate_instance<T: Serialize + ?Sized>(
		&self,
		instance: &T,
		relations: &[RelationDescriptor],
	) -> Result<(), RelationError> {
		let value = serde_json::to_value(instance).map_err(|err| RelationError::NotARecord {
			found: err.to_string(),
		})?;
		self.validate(&value, relations).await
	}

	/// Validates the value presented for one relation
	pub async fn validate_relation(
		&self,
		relation: &RelationDescriptor,
		value: Option<&Value>,
	) -> Result<(), RelationError> {
		let value = match value {
			None | Some(Value::Null) => {
				if relation.required {
					return Err(violation(
						relation,
						RelationError::Required {
							relation: relation.name.clone(),
						},
					));
				}
				return Ok(());
			}
			Some(value) => value,
		};

		if !relation.kind.is_to_many() {
			return self.check_exists(relation, value).await;
		}

		let Value::Array(items) = value else {
			return Err(RelationError::NotASequence {
				relation: relation.name.clone(),
				found: kind_of(value).to_string(),
			});
		};

		if let Some(min) = relation.min_items
			&& items.len() < min
		{
			return Err(violation(
				relation,
				RelationError::TooFew {
					relation: relation.name.clone(),
					min,
					actual: items.len(),
				},
			));
		}
		if let Some(max) = relation.max_items
			&& items.len() > max
		{
			return Err(violation(
				relation,
				RelationError::TooMany {
					relation: relation.name.clone(),
					max,
					actual: items.len(),
				},
			));
		}

		for item in items {
			self.check_exists(relation, item).await?;
		}
		Ok(())
	}

	async fn check_exists(&self, relation: &RelationDescriptor, value: &Value) -> Result<(), RelationError> {
		let Some(store) = self.store else {
			return Ok(());
		};

		let Some(reference_field) = relation
			.reference_field
			.as_deref()
			.filter(|field| !field.is_empty())
		else {
			return Err(RelationError::MissingReferenceField {
				relation: relation.name.clone(),
			});
		};

		let Some(entry) = self.registry.get(&relation.resource) else {
			return Err(RelationError::UnknownResource {
				relation: relation.name.clone(),
				resource: relation.resource.clone(),
			});
		};

		let reference = match value {
			Value::Object(candidate) => {
				candidate
					.get(reference_field)
					.ok_or_else(|| RelationError::MissingReferenceValue {
						relation: relation.name.clone(),
						reference_field: reference_field.to_string(),
					})?
			}
			other => other,
		};

		let count = store
			.count_where(&entry.table, reference_field, reference)
			.await
			.map_err(|source| RelationError::Store {
				relation: relation.name.clone(),
				source,
			})?;
		tracing::trace!(
			relation = %relation.name,
			table = %entry.table,
			column = reference_field,
			count,
			"checked relation reference"
		);

		if count == 0 {
			return Err(violation(
				relation,
				RelationError::NotFound {
					relation: relation.name.clone(),
					resource: relation.resource.clone(),
					reference_field: reference_field.to_string(),
					value: display_reference(reference),
				},
			));
		}
		Ok(())
	}
}

fn as_record(record: &Value) -> Result<&Map<String, Value>, RelationError> {
	record.as_object().ok_or_else(|| RelationError::NotARecord {
		found: kind_of(record).to_string(),
	})
}

/// The value under the relation name, or under its local field for to-one
/// relations
///
/// The local field of a to-many relation is the owner's own key, never a
/// sequence of references, so it is not consulted.
fn presented_value<'r>(record: &'r Map<String, Value>, relation: &RelationDescriptor) -> Option<&'r Value> {
	record.get(&relation.name).or_else(|| {
		if relation.kind.is_to_many() {
			return None;
		}
		relation
			.field
			.as_deref()
			.and_then(|field| record.get(field))
	})
}

/// Replaces a violation with the relation's custom message, if any
fn violation(relation: &RelationDescriptor, error: RelationError) -> RelationError {
	match &relation.message {
		Some(message) => RelationError::Custom {
			relation: relation.name.clone(),
			message: message.clone(),
		},
		None => error,
	}
}

fn display_reference(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::StoreError;
	use crate::registry::RegistryEntry;
	use crate::store::InMemoryStore;
	use async_trait::async_trait;
	use crudmeta_core::introspection::{FieldDef, TypeDescriptor};
	use crudmeta_core::relations::RelationKind;
	use rstest::{fixture, rstest};
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[fixture]
	fn registry() -> ResourceRegistry {
		let registry = ResourceRegistry::new();
		let user = TypeDescriptor::record("User", vec![FieldDef::of::<i64>("id")]);
		let tag = TypeDescriptor::record("Tag", vec![FieldDef::of::<String>("slug")]);
		registry.register(RegistryEntry::new("users", user));
		registry.register(RegistryEntry::new("tags", tag).with_table("tag_rows"));
		registry
	}

	#[fixture]
	fn store() -> InMemoryStore {
		let store = InMemoryStore::new();
		store.insert("users", json!({"id": 1}));
		store.insert("users", json!({"id": 2}));
		store.insert("tag_rows", json!({"slug": "rust"}));
		store.insert("tag_rows", json!({"slug": "web"}));
		store
	}

	fn author() -> RelationDescriptor {
		RelationDescriptor::new("author", RelationKind::ManyToOne, "users").with_reference("id")
	}

	fn tags() -> RelationDescriptor {
		RelationDescriptor::new("tags", RelationKind::ManyToMany, "tags").with_reference("slug")
	}

	struct CountingStore {
		inner: InMemoryStore,
		queries: AtomicUsize,
	}

	#[async_trait]
	impl RecordStore for CountingStore {
		async fn count_where(&self, table: &str, column: &str, value: &Value) -> Result<u64, StoreError> {
			self.queries.fetch_add(1, Ordering::SeqCst);
			self.inner.count_where(table, column, value).await
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_value_passes_unless_required(registry: ResourceRegistry) {
		let validator = RelationValidator::new(&registry);

		let optional = validator.validate(&json!({}), &[author()]).await;
		let required = validator.validate(&json!({"author": null}), &[author().required(true)]).await;

		assert!(optional.is_ok());
		assert_eq!(
			required.unwrap_err().to_string(),
			"relation author is required"
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_to_one_existence(registry: ResourceRegistry, store: InMemoryStore) {
		// Arrange
		let validator = RelationValidator::new(&registry).with_store(&store);

		// Act
		let by_scalar = validator.validate(&json!({"author": 1}), &[author()]).await;
		let by_object = validator.validate(&json!({"author": {"id": 2, "name": "Bo"}}), &[author()]).await;
		let missing = validator.validate(&json!({"author": 42}), &[author()]).await;

		// Assert
		assert!(by_scalar.is_ok());
		assert!(by_object.is_ok());
		assert_eq!(
			missing.unwrap_err().to_string(),
			"referenced users with id = 42 does not exist"
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_without_store_only_structure_is_checked(registry: ResourceRegistry) {
		let validator = RelationValidator::new(&registry);

		let result = validator.validate(&json!({"author": 42}), &[author()]).await;

		assert!(result.is_ok());
	}

	#[rstest]
	#[case::too_few(json!(["rust"]), Some(RelationError::TooFew { relation: "tags".into(), min: 2, actual: 1 }))]
	#[case::within(json!(["rust", "web"]), None)]
	#[case::too_many(
		json!(["rust", "web", "rust", "web"]),
		Some(RelationError::TooMany { relation: "tags".into(), max: 3, actual: 4 })
	)]
	#[tokio::test]
	async fn test_to_many_bounds(
		registry: ResourceRegistry,
		#[case] value: Value,
		#[case] expected: Option<RelationError>,
	) {
		let validator = RelationValidator::new(&registry);
		let relation = tags().with_bounds(Some(2), Some(3));

		let result = validator.validate(&json!({ "tags": value }), &[relation]).await;

		assert_eq!(result.err(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_to_many_short_circuits_on_first_missing(registry: ResourceRegistry, store: InMemoryStore) {
		// Arrange
		let counting = CountingStore {
			inner: store,
			queries: AtomicUsize::new(0),
		};
		let validator = RelationValidator::new(&registry).with_store(&counting);
		let record = json!({"tags": ["rust", "go", "zig", "web"]});

		// Act
		let err = validator.validate(&record, &[tags()]).await.unwrap_err();

		// Assert
		assert_eq!(
			err,
			RelationError::NotFound {
				relation: "tags".into(),
				resource: "tags".into(),
				reference_field: "slug".into(),
				value: "go".into(),
			}
		);
		assert_eq!(counting.queries.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_custom_message_overrides_violations(registry: ResourceRegistry, store: InMemoryStore) {
		let validator = RelationValidator::new(&registry).with_store(&store);
		let relation = author().required(true).with_message("choose an existing author");

		let missing = validator.validate(&json!({}), std::slice::from_ref(&relation)).await;
		let dangling = validator.validate(&json!({"author": 9}), std::slice::from_ref(&relation)).await;

		assert_eq!(missing.unwrap_err().to_string(), "choose an existing author");
		assert_eq!(dangling.unwrap_err().to_string(), "choose an existing author");
	}

	#[rstest]
	#[tokio::test]
	async fn test_setup_errors(registry: ResourceRegistry, store: InMemoryStore) {
		// Arrange
		let validator = RelationValidator::new(&registry).with_store(&store);
		let no_reference = RelationDescriptor::new("owner", RelationKind::OneToOne, "users");
		let unknown = RelationDescriptor::new("team", RelationKind::ManyToOne, "teams").with_reference("id");

		// Act
		let no_reference = validator.validate(&json!({"owner": 1}), &[no_reference]).await;
		let unknown = validator.validate(&json!({"team": 1}), &[unknown]).await;
		let not_sequence = validator.validate(&json!({"tags": "rust"}), &[tags()]).await;
		let key_missing = validator.validate(&json!({"author": {"name": "x"}}), &[author()]).await;

		// Assert
		assert!(matches!(no_reference, Err(RelationError::MissingReferenceField { .. })));
		assert!(matches!(unknown, Err(RelationError::UnknownResource { .. })));
		assert!(matches!(not_sequence, Err(RelationError::NotASequence { .. })));
		assert!(matches!(key_missing, Err(RelationError::MissingReferenceValue { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_non_record_instance_is_rejected(registry: ResourceRegistry) {
		let validator = RelationValidator::new(&registry);

		let result = validator.validate(&json!([1, 2]), &[author()]).await;

		assert_eq!(result, Err(RelationError::NotARecord { found: "array".into() }));
	}

	#[rstest]
	#[tokio::test]
	async fn test_validate_all_collects_per_relation(registry: ResourceRegistry, store: InMemoryStore) {
		let validator = RelationValidator::new(&registry).with_store(&store);
		let relations = [author().required(true), tags().with_bounds(Some(1), None)];

		let errors = validator
			.validate_all(&json!({"tags": []}), &relations)
			.await
			.unwrap_err();

		let names: Vec<Option<&str>> = errors.iter().map(RelationError::relation).collect();
		assert_eq!(names, vec![Some("author"), Some("tags")]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_local_field_fallback(registry: ResourceRegistry, store: InMemoryStore) {
		let validator = RelationValidator::new(&registry).with_store(&store);
		let relation = author().with_field("author_id");

		let result = validator.validate(&json!({"author_id": 77}), &[relation]).await;

		assert!(matches!(result, Err(RelationError::NotFound { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_to_many_ignores_owner_key_when_relation_is_absent(registry: ResourceRegistry) {
		// Arrange
		let posts = RelationDescriptor::new("posts", RelationKind::OneToMany, "posts")
			.with_field("id")
			.with_reference("author_id");
		let validator = RelationValidator::new(&registry);
		let record = json!({"id": 5, "name": "Ada"});

		// Act
		let optional = validator.validate(&record, &[posts.clone()]).await;
		let required = validator.validate(&record, &[posts.required(true)]).await;

		// Assert
		assert!(optional.is_ok());
		assert!(matches!(required, Err(RelationError::Required { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_store_failure_is_reported(registry: ResourceRegistry) {
		let empty = InMemoryStore::new();
		let validator = RelationValidator::new(&registry).with_store(&empty);

		let result = validator.validate(&json!({"author": 1}), &[author()]).await;

		assert!(matches!(
			result,
			Err(RelationError::Store { source: StoreError::UnknownTable { .. }, .. })
		));
	}
}
