//! Resource registry
//!
//! Maps resource names to their declared type and relations. The registry is
//! an explicit instance shared by reference; lookups take a read lock and
//! registration a write lock.
//!
//! Registering a name that is already present replaces the previous entry
//! (last writer wins). The replaced entry is returned so callers that care can
//! detect the overwrite.

use crudmeta_core::document::ResourceMetadataDocument;
use crudmeta_core::introspection::{Introspect, TypeDescriptor};
use crudmeta_core::relations::RelationDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered resource
#[derive(Debug, Clone)]
pub struct RegistryEntry {
	pub name: String,
	/// Table (or collection) queried for existence checks
	pub table: String,
	pub descriptor: TypeDescriptor,
	pub relations: Vec<RelationDescriptor>,
}

impl RegistryEntry {
	/// Creates an entry whose table is named after the resource
	pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
		let name = name.into();
		Self {
			table: name.clone(),
			name,
			descriptor,
			relations: Vec::new(),
		}
	}

	/// Creates an entry for `T`
	pub fn of<T: Introspect + ?Sized>(name: impl Into<String>) -> Self {
		Self::new(name, T::describe())
	}

	/// Creates an entry from a compiled document and the type it was compiled from
	pub fn from_document(document: &ResourceMetadataDocument, descriptor: TypeDescriptor) -> Self {
		Self::new(document.name.clone(), descriptor).with_relations(document.relations.clone())
	}

	pub fn with_table(mut self, table: impl Into<String>) -> Self {
		self.table = table.into();
		self
	}

	pub fn with_relations(mut self, relations: Vec<RelationDescriptor>) -> Self {
		self.relations = relations;
		self
	}

	pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
		self.relations.iter().find(|relation| relation.name == name)
	}
}

/// Name → entry map guarded by a reader/writer lock
///
/// # Examples
///
/// ```
/// use crudmeta_relations::registry::{RegistryEntry, ResourceRegistry};
///
/// let registry = ResourceRegistry::new();
/// registry.register(RegistryEntry::of::<i64>("counters"));
///
/// let replaced = registry.register(RegistryEntry::of::<i64>("counters").with_table("counter_rows"));
/// assert_eq!(replaced.unwrap().table, "counters");
/// assert_eq!(registry.get("counters").unwrap().table, "counter_rows");
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ResourceRegistry {
	entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
}

impl ResourceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts an entry, returning the entry it replaced
	pub fn register(&self, entry: RegistryEntry) -> Option<Arc<RegistryEntry>> {
		let name = entry.name.clone();
		let replaced = self.entries.write().insert(name.clone(), Arc::new(entry));
		if replaced.is_some() {
			tracing::debug!(resource = %name, "replaced registered resource");
		} else {
			tracing::debug!(resource = %name, "registered resource");
		}
		replaced
	}

	pub fn get(&self, name: &str) -> Option<Arc<RegistryEntry>> {
		self.entries.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.read().contains_key(name)
	}

	/// Registered names in sorted order
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn remove(&self, name: &str) -> Option<Arc<RegistryEntry>> {
		self.entries.write().remove(name)
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}
}
