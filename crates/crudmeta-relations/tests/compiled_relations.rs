//! Relation checks driven by compiled metadata
//!
//! Resources are compiled with the core compiler, registered, and their
//! relations validated against a store backed by a plain map.

use async_trait::async_trait;
use crudmeta_core::document::ResourceOptions;
use crudmeta_core::introspection::{FieldDef, Introspect, TypeDescriptor};
use crudmeta_core::MetadataCompiler;
use crudmeta_relations::{RecordStore, RegistryEntry, RelationError, RelationValidator, ResourceRegistry, StoreError};
use rstest::*;
use serde_json::{Value, json};
use std::collections::HashMap;

struct Author;

impl Introspect for Author {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::record("Author", vec![FieldDef::of::<i64>("Id"), FieldDef::of::<String>("Name")])
	}
}

struct Book;

impl Introspect for Book {
	fn describe() -> TypeDescriptor {
		TypeDescriptor::record(
			"Book",
			vec![
				FieldDef::of::<i64>("Id"),
				FieldDef::of::<Author>("Author")
					.tag("relation", "resource=authors;type=many_to_one;reference=id;required"),
				FieldDef::of::<Vec<i64>>("CoAuthors")
					.tag("relation", "resource=authors;type=many_to_many;reference=id;max=2"),
			],
		)
	}
}

/// Table → set of ids
struct IdStore {
	tables: HashMap<&'static str, Vec<i64>>,
}

#[async_trait]
impl RecordStore for IdStore {
	async fn count_where(&self, table: &str, column: &str, value: &Value) -> Result<u64, StoreError> {
		if column != "id" {
			return Err(StoreError::Backend {
				message: format!("no column {}", column),
			});
		}
		let ids = self.tables.get(table).ok_or_else(|| StoreError::UnknownTable {
			table: table.to_string(),
		})?;
		Ok(ids.iter().filter(|id| value.as_i64() == Some(**id)).count() as u64)
	}
}

#[fixture]
fn registry() -> ResourceRegistry {
	let compiler = MetadataCompiler::default();
	let registry = ResourceRegistry::new();
	for (name, descriptor) in [("authors", Author::describe()), ("books", Book::describe())] {
		let document = compiler
			.compile_descriptor(&descriptor, ResourceOptions::new(name))
			.unwrap();
		registry.register(RegistryEntry::from_document(&document, descriptor));
	}
	registry
}

#[fixture]
fn store() -> IdStore {
	IdStore {
		tables: HashMap::from([("authors", vec![1, 2, 3])]),
	}
}

#[rstest]
#[tokio::test]
async fn test_book_relations_are_registered(registry: ResourceRegistry) {
	let books = registry.get("books").unwrap();

	assert_eq!(books.relations.len(), 2);
	assert!(books.relation("author").unwrap().required);
	assert_eq!(books.relation("co_authors").unwrap().max_items, Some(2));
	assert!(registry.get("authors").unwrap().relations.is_empty());
}

#[rstest]
#[case::valid(json!({"id": 10, "author": {"id": 1, "name": "Le Guin"}, "co_authors": [2, 3]}), None)]
#[case::missing_author(json!({"id": 10, "co_authors": []}), Some("relation author is required"))]
#[case::dangling_author(json!({"id": 10, "author": 99}), Some("referenced authors with id = 99 does not exist"))]
#[case::too_many_co_authors(
	json!({"id": 10, "author": 1, "co_authors": [1, 2, 3]}),
	Some("relation co_authors allows at most 2 items, got 3")
)]
#[case::dangling_co_author(
	json!({"id": 10, "author": 1, "co_authors": [2, 7]}),
	Some("referenced authors with id = 7 does not exist")
)]
#[tokio::test]
async fn test_validate_book_records(
	registry: ResourceRegistry,
	store: IdStore,
	#[case] record: Value,
	#[case] expected: Option<&str>,
) {
	// Arrange
	let relations = registry.get("books").unwrap().relations.clone();
	let validator = RelationValidator::new(&registry).with_store(&store);

	// Act
	let result = validator.validate(&record, &relations).await;

	// Assert
	assert_eq!(result.err().map(|err| err.to_string()).as_deref(), expected);
}

#[rstest]
#[tokio::test]
async fn test_structural_validation_without_store(registry: ResourceRegistry) {
	let relations = registry.get("books").unwrap().relations.clone();
	let validator = RelationValidator::new(&registry);

	let result = validator
		.validate(&json!({"author": 99, "co_authors": [7, 8]}), &relations)
		.await;

	assert!(result.is_ok());
}

#[rstest]
#[tokio::test]
async fn test_serializable_instances_are_validated(registry: ResourceRegistry, store: IdStore) {
	#[derive(serde::Serialize)]
	struct BookRow {
		id: i64,
		author: i64,
		co_authors: Vec<i64>,
	}

	let relations = registry.get("books").unwrap().relations.clone();
	let validator = RelationValidator::new(&registry).with_store(&store);
	let row = BookRow {
		id: 1,
		author: 3,
		co_authors: vec![1],
	};

	assert!(validator.validate_instance(&row, &relations).await.is_ok());
	assert!(matches!(
		validator.validate_instance(&vec![row], &relations).await,
		Err(RelationError::NotARecord { .. })
	));
}
