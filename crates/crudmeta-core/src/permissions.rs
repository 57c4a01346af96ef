//! Role-based permission filtering
//!
//! A [`PermissionSet`] maps operation names (`read`, `update`, ...) to the
//! roles permitted to perform them. Under the default
//! [`AccessPolicy::FailOpen`] policy, absence of permission data always
//! permits access:
//!
//! ```text
//! allowed(op, roles) = permissions is None
//!                   OR permissions[op] is absent or empty
//!                   OR roles ∩ permissions[op] ≠ ∅
//! ```
//!
//! This is a security-relevant default. Resources that must be closed unless
//! explicitly opened should compile with [`AccessPolicy::FailClosed`].

use crate::annotation::{AnnotationToken, parse_annotation};
use crate::settings::AccessPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Operation name → permitted roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
	operations: BTreeMap<String, BTreeSet<String>>,
}

impl PermissionSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds roles to an operation
	///
	/// # Examples
	///
	/// ```
	/// use crudmeta_core::permissions::PermissionSet;
	///
	/// let perms = PermissionSet::new().grant("read", ["admin", "editor"]);
	/// assert!(perms.roles_for("read").unwrap().contains("editor"));
	/// assert!(perms.roles_for("delete").is_none());
	/// ```
	pub fn grant<I, S>(mut self, operation: impl Into<String>, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.operations
			.entry(operation.into())
			.or_default()
			.extend(roles.into_iter().map(Into::into));
		self
	}

	/// Roles allowed to perform `operation`, if the operation is listed
	pub fn roles_for(&self, operation: &str) -> Option<&BTreeSet<String>> {
		self.operations.get(operation)
	}

	pub fn operations(&self) -> impl Iterator<Item = &str> {
		self.operations.keys().map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	/// Whether `roles` may perform `operation` under `policy`
	pub fn permits<S: AsRef<str>>(
		&self,
		operation: &str,
		roles: &[S],
		policy: AccessPolicy,
	) -> bool {
		match self.roles_for(operation) {
			Some(allowed) if !allowed.is_empty() => roles
				.iter()
				.any(|role| allowed.contains(role.as_ref())),
			_ => policy == AccessPolicy::FailOpen,
		}
	}
}

/// Parses the permission annotation form `read=admin,editor;update=admin`
///
/// Bare flags and empty role lists are ignored.
pub fn parse_permissions(raw: &str) -> PermissionSet {
	parse_annotation(raw)
		.into_iter()
		.fold(PermissionSet::new(), |perms, token| match token {
			AnnotationToken::Pair { key, value } => {
				let roles: Vec<&str> = value
					.split(',')
					.map(str::trim)
					.filter(|role| !role.is_empty())
					.collect();
				if roles.is_empty() {
					perms
				} else {
					perms.grant(key, roles)
				}
			}
			AnnotationToken::Flag { .. } => perms,
		})
}

/// Resource-level access check
///
/// # Examples
///
/// ```
/// use crudmeta_core::permissions::{PermissionSet, allowed};
/// use crudmeta_core::settings::AccessPolicy;
///
/// let perms = PermissionSet::new().grant("delete", ["admin"]);
/// let none: [&str; 0] = [];
///
/// assert!(allowed(Some(&perms), "delete", &["admin"], AccessPolicy::FailOpen));
/// assert!(!allowed(Some(&perms), "delete", &["viewer"], AccessPolicy::FailOpen));
/// assert!(allowed(Some(&perms), "read", &none, AccessPolicy::FailOpen));
/// assert!(allowed(None, "delete", &none, AccessPolicy::FailOpen));
/// ```
pub fn allowed<S: AsRef<str>>(
	permissions: Option<&PermissionSet>,
	operation: &str,
	roles: &[S],
	policy: AccessPolicy,
) -> bool {
	match permissions {
		Some(perms) => perms.permits(operation, roles, policy),
		None => policy == AccessPolicy::FailOpen,
	}
}

/// Items carrying their own field-level permission map
pub trait PermissionScoped {
	/// Serialized name of the item
	fn scoped_name(&self) -> &str;

	fn permissions(&self) -> Option<&PermissionSet>;
}

/// Keeps the items `roles` may access for `operation`, preserving order
pub fn filter_fields<'a, T, S>(
	fields: &'a [T],
	operation: &str,
	roles: &[S],
	policy: AccessPolicy,
) -> Vec<&'a T>
where
	T: PermissionScoped,
	S: AsRef<str>,
{
	fields
		.iter()
		.filter(|field| allowed(field.permissions(), operation, roles, policy))
		.collect()
}

/// Removes every key of `record` whose field `roles` may not access
///
/// Keys that do not correspond to any described field are left untouched.
/// Returns the names of the removed keys.
pub fn redact_record<T, S>(
	fields: &[T],
	record: &mut Map<String, Value>,
	operation: &str,
	roles: &[S],
	policy: AccessPolicy,
) -> Vec<String>
where
	T: PermissionScoped,
	S: AsRef<str>,
{
	let mut removed = Vec::new();
	for field in fields {
		if !allowed(field.permissions(), operation, roles, policy)
			&& record.remove(field.scoped_name()).is_some()
		{
			removed.push(field.scoped_name().to_string());
		}
	}
	if !removed.is_empty() {
		tracing::trace!(operation, ?removed, "redacted record fields");
	}
	removed
}
