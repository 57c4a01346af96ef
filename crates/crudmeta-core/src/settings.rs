//! Compiler settings and leniency policies
//!
//! The pipeline deliberately tolerates malformed input: bad numeric literals,
//! unparseable relation annotations and missing permission data degrade to
//! "no constraint" or "access permitted". These defaults are security relevant,
//! so they are exposed here as named policies that callers and tests can assert
//! on and, where needed, tighten.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! leniency = "strict"
//! access_policy = "fail_open"
//! default_operations = ["list", "read", "create", "update", "delete"]
//!
//! [tags]
//! field = "crud"
//! relation = "relation"
//! permission = "permission"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading settings
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// How malformed annotation input is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leniency {
	/// Silently drop the malformed constraint (compatibility default)
	#[default]
	Lenient,
	/// Surface malformed input as a compilation error
	Strict,
}

impl Leniency {
	pub fn is_lenient(self) -> bool {
		matches!(self, Leniency::Lenient)
	}
}

/// How absent permission data is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
	/// Missing permission data permits access (compatibility default)
	#[default]
	FailOpen,
	/// Missing permission data denies access
	FailClosed,
}

/// Annotation tag keys consulted on each field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagKeys {
	/// Field extraction and validation hints
	pub field: String,
	/// Explicit relation declarations
	pub relation: String,
	/// Field-level permission map
	pub permission: String,
}

impl Default for TagKeys {
	fn default() -> Self {
		Self {
			field: "crud".to_string(),
			relation: "relation".to_string(),
			permission: "permission".to_string(),
		}
	}
}

/// Settings for the metadata compiler
///
/// # Examples
///
/// ```
/// use crudmeta_core::settings::{AccessPolicy, Leniency, MetadataSettings};
///
/// let settings = MetadataSettings::default();
/// assert_eq!(settings.leniency, Leniency::Lenient);
/// assert_eq!(settings.access_policy, AccessPolicy::FailOpen);
/// assert_eq!(settings.tags.field, "crud");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
	pub tags: TagKeys,
	pub leniency: Leniency,
	pub access_policy: AccessPolicy,
	/// Operations granted to a resource that does not list its own
	pub default_operations: Vec<String>,
}

impl Default for MetadataSettings {
	fn default() -> Self {
		Self {
			tags: TagKeys::default(),
			leniency: Leniency::default(),
			access_policy: AccessPolicy::default(),
			default_operations: ["list", "read", "create", "update", "delete"]
				.into_iter()
				.map(String::from)
				.collect(),
		}
	}
}

impl MetadataSettings {
	/// Parses settings from TOML text; missing keys keep their defaults
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::settings::{Leniency, MetadataSettings};
	///
	/// let settings = MetadataSettings::from_toml_str(r#"leniency = "strict""#).unwrap();
	/// assert_eq!(settings.leniency, Leniency::Strict);
	/// assert_eq!(settings.tags.relation, "relation");
	/// ```
	pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(text)?)
	}

	/// Loads settings from a TOML file
	pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let text = std::fs::read_to_string(path)?;
		Self::from_toml_str(&text)
	}

	pub fn with_leniency(mut self, leniency: Leniency) -> Self {
		self.leniency = leniency;
		self
	}

	pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
		self.access_policy = policy;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_partial_toml_keeps_defaults() {
		// Arrange
		let text = r#"
access_policy = "fail_closed"

[tags]
field = "meta"
"#;

		// Act
		let settings = MetadataSettings::from_toml_str(text).unwrap();

		// Assert
		assert_eq!(settings.access_policy, AccessPolicy::FailClosed);
		assert_eq!(settings.tags.field, "meta");
		assert_eq!(settings.tags.permission, "permission");
		assert_eq!(settings.leniency, Leniency::Lenient);
		assert_eq!(settings.default_operations.len(), 5);
	}

	#[rstest]
	fn test_unknown_policy_is_rejected() {
		let result = MetadataSettings::from_toml_str(r#"leniency = "sometimes""#);

		assert!(matches!(result, Err(SettingsError::Toml(_))));
	}

	#[rstest]
	fn test_load_from_file() {
		// Arrange
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "default_operations = [\"list\", \"read\"]").unwrap();

		// Act
		let settings = MetadataSettings::from_toml_file(file.path()).unwrap();

		// Assert
		assert_eq!(settings.default_operations, vec!["list", "read"]);
	}

	#[rstest]
	fn test_missing_file_is_io_error() {
		let result = MetadataSettings::from_toml_file("/nonexistent/crudmeta.toml");

		assert!(matches!(result, Err(SettingsError::Io(_))));
	}
}
