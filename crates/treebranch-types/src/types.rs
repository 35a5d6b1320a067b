//! Common small types

use serde::{Deserialize, Deserializer, Serialize};
use serde_with::skip_serializing_none;

// Patch //
//*******//

/// Three-state update field: leave untouched, clear, or set
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
	#[default]
	Undefined,
	Null,
	Value(T),
}

impl<T> Patch<T> {
	pub fn is_undefined(&self) -> bool {
		matches!(self, Patch::Undefined)
	}

	pub fn value(&self) -> Option<&T> {
		match self {
			Patch::Value(v) => Some(v),
			_ => None,
		}
	}

	pub fn map<U, F: FnOnce(&T) -> U>(&self, f: F) -> Patch<U> {
		match self {
			Patch::Undefined => Patch::Undefined,
			Patch::Null => Patch::Null,
			Patch::Value(v) => Patch::Value(f(v)),
		}
	}
}

/// `None` clears the field
impl<T> From<Option<T>> for Patch<T> {
	fn from(value: Option<T>) -> Self {
		match value {
			Some(v) => Patch::Value(v),
			None => Patch::Null,
		}
	}
}

impl<T: Clone> Patch<T> {
	/// Applies the patch to a nullable field
	pub fn apply(&self, target: &mut Option<T>) {
		match self {
			Patch::Undefined => {}
			Patch::Null => *target = None,
			Patch::Value(v) => *target = Some(v.clone()),
		}
	}
}

impl<T: Clone + Default> Patch<T> {
	/// Applies the patch to a non-nullable field, `Null` resets it to the default
	pub fn apply_value(&self, target: &mut T) {
		match self {
			Patch::Undefined => {}
			Patch::Null => *target = T::default(),
			Patch::Value(v) => *target = v.clone(),
		}
	}
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(match Option::<T>::deserialize(deserializer)? {
			Some(v) => Patch::Value(v),
			None => Patch::Null,
		})
	}
}

// Auth //
//******//

/// Caller identity as handed over by the API layer
#[derive(Debug, Clone, Default)]
pub struct AuthCtx {
	pub organization_id: Option<String>,
	pub is_super_admin: bool,
}

impl AuthCtx {
	pub fn organization(organization_id: impl Into<String>) -> Self {
		Self { organization_id: Some(organization_id.into()), is_super_admin: false }
	}

	pub fn super_admin() -> Self {
		Self { organization_id: None, is_super_admin: true }
	}

	/// Whether the caller may read and copy a tree owned by `tree_org`
	pub fn can_access(&self, tree_org: Option<&str>) -> bool {
		if self.is_super_admin {
			return true;
		}
		match (self.organization_id.as_deref(), tree_org) {
			(Some(caller), Some(owner)) => caller == owner,
			_ => false,
		}
	}
}

// Repeat context //
//****************//

/// Describes the repeated-block generation a duplication belongs to
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatContext {
	pub repeater_node_id: String,
	pub template_node_id: Option<String>,
	pub scope_id: Option<String>,
	pub suffix: Option<String>,
	pub mode: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_patch_apply() {
		let mut field = Some("a".to_string());
		Patch::Undefined.apply(&mut field);
		assert_eq!(field.as_deref(), Some("a"));
		Patch::Value("b".to_string()).apply(&mut field);
		assert_eq!(field.as_deref(), Some("b"));
		Patch::<String>::Null.apply(&mut field);
		assert_eq!(field, None);

		let mut list = vec!["x".to_string()];
		Patch::<Vec<String>>::Null.apply_value(&mut list);
		assert!(list.is_empty());

		assert_eq!(Patch::from(Some(1)), Patch::Value(1));
		assert_eq!(Patch::<u32>::from(None), Patch::Null);
	}

	#[test]
	fn test_patch_deserialize() {
		#[derive(Deserialize)]
		struct Update {
			#[serde(default)]
			a: Patch<u32>,
			#[serde(default)]
			b: Patch<u32>,
			#[serde(default)]
			c: Patch<u32>,
		}
		let update: Update = serde_json::from_str(r#"{"a": 3, "b": null}"#).unwrap();
		assert_eq!(update.a, Patch::Value(3));
		assert_eq!(update.b, Patch::Null);
		assert!(update.c.is_undefined());
	}

	#[test]
	fn test_auth_access() {
		assert!(AuthCtx::super_admin().can_access(Some("org-1")));
		assert!(AuthCtx::super_admin().can_access(None));
		assert!(AuthCtx::organization("org-1").can_access(Some("org-1")));
		assert!(!AuthCtx::organization("org-2").can_access(Some("org-1")));
		assert!(!AuthCtx::organization("org-1").can_access(None));
		assert!(!AuthCtx::default().can_access(Some("org-1")));
	}
}

// vim: ts=4
