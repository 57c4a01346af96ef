//! Data-store collaborator contract

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;

/// Minimal query capability needed for referential existence checks
///
/// Implementations wrap whatever persistence layer the application uses.
/// Deadlines and cancellation are the implementation's concern.
#[async_trait]
pub trait RecordStore: Send + Sync {
	/// Counts rows of `table` whose `column` equals `value`
	async fn count_where(&self, table: &str, column: &str, value: &Value) -> Result<u64, StoreError>;
}

#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryStore;

#[cfg(any(test, feature = "testing"))]
mod memory {
	use super::*;
	use parking_lot::RwLock;
	use serde_json::{Map, Value};
	use std::collections::HashMap;

	/// Table-name → rows store held in memory
	///
	/// Querying a table that was never created is a
	/// [`StoreError::UnknownTable`].
	///
	/// # Examples
	///
	/// Only compiled with the `testing` feature, so the example runs under
	/// `cargo test --features testing`.
	///
	/// ```
	/// use crudmeta_relations::store::{InMemoryStore, RecordStore};
	/// use serde_json::json;
	///
	/// # #[tokio::main]
	/// # async fn main() {
	/// let store = InMemoryStore::new();
	/// store.insert("users", json!({"id": 1, "name": "Ada"}));
	///
	/// assert_eq!(store.count_where("users", "id", &json!(1)).await.unwrap(), 1);
	/// assert_eq!(store.count_where("users", "id", &json!(2)).await.unwrap(), 0);
	/// # }
	/// ```
	#[derive(Debug, Default)]
	pub struct InMemoryStore {
		tables: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
	}

	impl InMemoryStore {
		pub fn new() -> Self {
			Self::default()
		}

		/// Creates `table` without rows
		pub fn create_table(&self, table: impl Into<String>) {
			self.tables.write().entry(table.into()).or_default();
		}

		/// Appends a row; values that are not objects are ignored
		pub fn insert(&self, table: impl Into<String>, row: Value) {
			let mut tables = self.tables.write();
			let rows = tables.entry(table.into()).or_default();
			if let Value::Object(row) = row {
				rows.push(row);
			}
		}

		pub fn row_count(&self, table: &str) -> usize {
			self.tables.read().get(table).map_or(0, Vec::len)
		}
	}

	#[async_trait]
	impl RecordStore for InMemoryStore {
		async fn count_where(&self, table: &str, column: &str, value: &Value) -> Result<u64, StoreError> {
			let tables = self.tables.read();
			let rows = tables.get(table).ok_or_else(|| StoreError::UnknownTable {
				table: table.to_string(),
			})?;
			Ok(rows.iter().filter(|row| row.get(column) == Some(value)).count() as u64)
		}
	}
}
