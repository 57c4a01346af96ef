//! # crudmeta relations
//!
//! Resource registry and relation consistency validation.
//!
//! Compilation in `crudmeta-core` is synchronous and side-effect free. The
//! pieces here run later, per record instance: a [`ResourceRegistry`] resolves
//! target resources by name and a [`RecordStore`] answers existence queries
//! for the [`RelationValidator`].
//!
//! ## Feature Flags
//!
//! - `testing`: enables [`store::InMemoryStore`]

pub mod consistency;
pub mod error;
pub mod registry;
pub mod store;

pub use consistency::RelationValidator;
pub use error::{RelationError, StoreError};
pub use registry::{RegistryEntry, ResourceRegistry};
pub use store::RecordStore;

#[cfg(feature = "testing")]
pub use store::InMemoryStore;
