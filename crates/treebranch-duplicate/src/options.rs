//! Duplication options and engine settings

use treebranch_types::types::RepeatContext;

use crate::suffix::DEFAULT_MAX_SUFFIX_DIGITS;

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct DuplicateOptions {
	/// Suffix token, computed from existing copies when unset
	pub suffix: Option<String>,
	/// Parent of the root copy, the resolved original parent when unset
	pub target_parent_id: Option<String>,
	pub preserve_shared_references: bool,
	pub clone_external_parents: bool,
	pub is_repeat_instance: bool,
	pub repeat_context: Option<RepeatContext>,
}

impl DuplicateOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
		self.suffix = Some(suffix.into());
		self
	}
	pub fn target_parent_id(&mut self, target_parent_id: impl Into<String>) -> &mut Self {
		self.target_parent_id = Some(target_parent_id.into());
		self
	}
	pub fn preserve_shared_references(&mut self, preserve: bool) -> &mut Self {
		self.preserve_shared_references = preserve;
		self
	}
	pub fn clone_external_parents(&mut self, clone: bool) -> &mut Self {
		self.clone_external_parents = clone;
		self
	}
	pub fn repeat_instance(&mut self, is_repeat_instance: bool) -> &mut Self {
		self.is_repeat_instance = is_repeat_instance;
		self
	}
	pub fn repeat_context(&mut self, repeat_context: RepeatContext) -> &mut Self {
		self.repeat_context = Some(repeat_context);
		self
	}
}

/// Engine-wide settings
#[derive(Debug, Clone)]
pub struct DuplicatorConfig {
	/// Node types never cloned as external parents
	pub exempt_parent_types: Vec<String>,
	/// Type of synthesized variable display nodes
	pub display_node_type: String,
	/// Longest trailing number treated as a generation suffix
	pub max_suffix_digits: usize,
}

impl Default for DuplicatorConfig {
	fn default() -> Self {
		Self {
			exempt_parent_types: vec!["section".into()],
			display_node_type: "leaf_field".into(),
			max_suffix_digits: DEFAULT_MAX_SUFFIX_DIGITS,
		}
	}
}

impl DuplicatorConfig {
	pub fn is_exempt_parent(&self, node_type: &str) -> bool {
		self.exempt_parent_types.iter().any(|t| t == node_type)
	}
}

// vim: ts=4
