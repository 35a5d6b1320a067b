//! Typed reference walker
//!
//! Identifiers of nodes and capacities are embedded in strings as tagged
//! references (`@value.<nodeId>`, `node-formula:<id>`, `@table.<id>`, ...)
//! or stored bare inside known fields (`nodeIds` of condition actions,
//! lookup selectors of table metadata). Every reference is parsed into a
//! [`Reference`] of a closed [`RefKind`] and resolved through the run's
//! identifier maps. Unmapped identifiers are external and get the suffix
//! policy applied.

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::suffix::SuffixPolicy;
use treebranch_types::prelude::*;

pub const SHARED_REF_PREFIX: &str = "shared-ref-";

#[allow(clippy::expect_used)]
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"(@value\.node-formula:|@value\.node-condition:|@value\.condition:|@value\.node-table:",
		r"|@value\.|@table\.|node-formula:|node-condition:|node-table:|condition:)",
		r"([A-Za-z0-9_-]+)",
	))
	.expect("reference pattern is valid")
});

/// Keys whose string values hold bare (untagged) references
const BARE_KEYS: [&str; 3] = ["nodeIds", "nodeId", "ref"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefKind {
	Node,
	SharedRef,
	Formula,
	Condition,
	Table,
}

/// The textual tag a reference was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPrefix {
	Value,
	ValueFormula,
	ValueNodeCondition,
	ValueCondition,
	ValueTable,
	Table,
	Formula,
	NodeCondition,
	Condition,
	NodeTable,
	/// No tag, a plain node id
	Bare,
}

impl RefPrefix {
	/// Tagged prefixes, longest first
	const TAGGED: [RefPrefix; 10] = [
		RefPrefix::ValueFormula,
		RefPrefix::ValueNodeCondition,
		RefPrefix::ValueCondition,
		RefPrefix::ValueTable,
		RefPrefix::Value,
		RefPrefix::Table,
		RefPrefix::Formula,
		RefPrefix::NodeCondition,
		RefPrefix::NodeTable,
		RefPrefix::Condition,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			RefPrefix::Value => "@value.",
			RefPrefix::ValueFormula => "@value.node-formula:",
			RefPrefix::ValueNodeCondition => "@value.node-condition:",
			RefPrefix::ValueCondition => "@value.condition:",
			RefPrefix::ValueTable => "@value.node-table:",
			RefPrefix::Table => "@table.",
			RefPrefix::Formula => "node-formula:",
			RefPrefix::NodeCondition => "node-condition:",
			RefPrefix::Condition => "condition:",
			RefPrefix::NodeTable => "node-table:",
			RefPrefix::Bare => "",
		}
	}

	fn from_tag(tag: &str) -> Option<Self> {
		Self::TAGGED.into_iter().find(|p| p.as_str() == tag)
	}

	fn kind(self) -> RefKind {
		match self {
			RefPrefix::Value | RefPrefix::Bare => RefKind::Node,
			RefPrefix::ValueFormula | RefPrefix::Formula => RefKind::Formula,
			RefPrefix::ValueNodeCondition
			| RefPrefix::ValueCondition
			| RefPrefix::NodeCondition
			| RefPrefix::Condition => RefKind::Condition,
			RefPrefix::ValueTable | RefPrefix::Table | RefPrefix::NodeTable => RefKind::Table,
		}
	}
}

fn is_id(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
	pub prefix: RefPrefix,
	pub kind: RefKind,
	pub id: String,
}

impl Reference {
	pub fn new(prefix: RefPrefix, id: impl Into<String>) -> Self {
		let id = id.into();
		let kind = match prefix.kind() {
			RefKind::Node if id.starts_with(SHARED_REF_PREFIX) => RefKind::SharedRef,
			kind => kind,
		};
		Self { prefix, kind, id }
	}

	/// Parses a whole string as one reference, tagged or bare
	pub fn parse_bare(s: &str) -> Option<Self> {
		for prefix in RefPrefix::TAGGED {
			if let Some(id) = s.strip_prefix(prefix.as_str()) {
				return is_id(id).then(|| Self::new(prefix, id));
			}
		}
		is_id(s).then(|| Self::new(RefPrefix::Bare, s))
	}

	/// All tagged references embedded in a string
	pub fn find_all(text: &str) -> Vec<Self> {
		REFERENCE_RE
			.captures_iter(text)
			.filter_map(|caps| {
				let prefix = RefPrefix::from_tag(caps.get(1)?.as_str())?;
				Some(Self::new(prefix, caps.get(2)?.as_str()))
			})
			.collect()
	}

	pub fn render(&self, id: &str) -> String {
		format!("{}{}", self.prefix.as_str(), id)
	}
}

/// Old to new identifier maps of one run, per entity class
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMaps {
	pub nodes: BTreeMap<String, String>,
	pub formulas: BTreeMap<String, String>,
	pub conditions: BTreeMap<String, String>,
	pub tables: BTreeMap<String, String>,
	pub variables: BTreeMap<String, String>,
}

impl IdMaps {
	pub fn for_kind(&self, kind: RefKind) -> &BTreeMap<String, String> {
		match kind {
			RefKind::Node | RefKind::SharedRef => &self.nodes,
			RefKind::Formula => &self.formulas,
			RefKind::Condition => &self.conditions,
			RefKind::Table => &self.tables,
		}
	}
}

/// Rewrites references through the identifier maps
///
/// Identifiers not found in the maps are derived with the suffix policy and
/// remembered as external, so they can be checked once the run is over.
#[derive(Debug)]
pub struct Rewriter<'a> {
	maps: &'a IdMaps,
	policy: &'a SuffixPolicy,
	preserve_shared: bool,
	external: BTreeSet<(RefKind, String)>,
}

impl<'a> Rewriter<'a> {
	pub fn new(maps: &'a IdMaps, policy: &'a SuffixPolicy, preserve_shared: bool) -> Self {
		Self { maps, policy, preserve_shared, external: BTreeSet::new() }
	}

	pub fn resolve(&mut self, kind: RefKind, id: &str) -> String {
		if let Some(mapped) = self.maps.for_kind(kind).get(id) {
			return mapped.clone();
		}
		if kind == RefKind::SharedRef && self.preserve_shared {
			return id.to_string();
		}
		let derived = self.policy.derive(id);
		self.external.insert((kind, derived.clone()));
		derived
	}

	/// Maps through the identifier maps only, unmapped ids stay as they are
	pub fn map_or_keep(&self, kind: RefKind, id: &str) -> String {
		self.maps.for_kind(kind).get(id).cloned().unwrap_or_else(|| id.to_string())
	}

	pub fn rewrite_reference(&mut self, reference: &Reference) -> String {
		let id = self.resolve(reference.kind, &reference.id);
		reference.render(&id)
	}

	/// Rewrites every tagged reference embedded in a string
	pub fn rewrite_str(&mut self, text: &str) -> String {
		if is_json_text(text) {
			return self.rewrite_json_text(text);
		}
		self.rewrite_embedded(text)
	}

	fn rewrite_embedded(&mut self, text: &str) -> String {
		REFERENCE_RE
			.replace_all(text, |caps: &Captures| {
				let (Some(tag), Some(id)) = (caps.get(1), caps.get(2)) else {
					return caps[0].to_string();
				};
				match RefPrefix::from_tag(tag.as_str()) {
					Some(prefix) => self.rewrite_reference(&Reference::new(prefix, id.as_str())),
					None => caps[0].to_string(),
				}
			})
			.into_owned()
	}

	/// Rewrites a string holding serialized JSON, unparseable text is left unchanged
	pub fn rewrite_json_text(&mut self, text: &str) -> String {
		let value = match serde_json::from_str::<Value>(text) {
			Ok(value) => value,
			Err(err) => {
				warn!(error = %err, "embedded JSON text not parseable, references left unchanged");
				return text.to_string();
			}
		};
		let rewritten = self.rewrite_value(&value);
		serde_json::to_string(&rewritten).unwrap_or_else(|err| {
			warn!(error = %err, "rewritten JSON text not serializable, left unchanged");
			text.to_string()
		})
	}

	/// A string holding exactly one reference; a plain id is a node reference
	pub fn rewrite_bare(&mut self, text: &str) -> String {
		match Reference::parse_bare(text) {
			Some(reference) => self.rewrite_reference(&reference),
			None => self.rewrite_str(text),
		}
	}

	/// Free-form JSON: every string leaf
	pub fn rewrite_value(&mut self, value: &Value) -> Value {
		match value {
			Value::String(s) => Value::String(self.rewrite_str(s)),
			Value::Array(items) => Value::Array(items.iter().map(|v| self.rewrite_value(v)).collect()),
			Value::Object(map) => {
				Value::Object(map.iter().map(|(k, v)| (k.clone(), self.rewrite_value(v))).collect())
			}
			other => other.clone(),
		}
	}

	/// Formula token list
	pub fn rewrite_tokens(&mut self, tokens: &[Value]) -> Vec<Value> {
		tokens
			.iter()
			.map(|token| match token {
				Value::Object(map) => Value::Object(
					map.iter()
						.map(|(k, v)| {
							let v = match v {
								Value::String(s) if BARE_KEYS.contains(&k.as_str()) => {
									Value::String(self.rewrite_bare(s))
								}
								other => self.rewrite_value(other),
							};
							(k.clone(), v)
						})
						.collect(),
				),
				other => self.rewrite_value(other),
			})
			.collect()
	}

	/// Condition set: nested branches whose actions list bare node ids
	pub fn rewrite_condition_set(&mut self, value: &Value) -> Value {
		match value {
			Value::Object(map) => Value::Object(
				map.iter()
					.map(|(k, v)| {
						let v = if BARE_KEYS.contains(&k.as_str()) {
							self.rewrite_bare_field(v)
						} else {
							self.rewrite_condition_set(v)
						};
						(k.clone(), v)
					})
					.collect(),
			),
			Value::Array(items) => {
				Value::Array(items.iter().map(|v| self.rewrite_condition_set(v)).collect())
			}
			Value::String(s) => Value::String(self.rewrite_str(s)),
			other => other.clone(),
		}
	}

	fn rewrite_bare_field(&mut self, value: &Value) -> Value {
		match value {
			Value::String(s) => Value::String(self.rewrite_bare(s)),
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|item| match item {
						Value::String(s) => Value::String(self.rewrite_bare(s)),
						other => self.rewrite_condition_set(other),
					})
					.collect(),
			),
			other => self.rewrite_condition_set(other),
		}
	}

	/// Table lookup metadata
	pub fn rewrite_table_meta(&mut self, meta: &Value) -> Value {
		let mut out = self.rewrite_value(meta);
		let Some(lookup) = meta.get("lookup") else {
			return out;
		};

		for pointer in [
			"/selectors/columnFieldId",
			"/selectors/rowFieldId",
			"/rowSourceOption/sourceField",
			"/columnSourceOption/sourceField",
		] {
			if let Some(Value::String(id)) = lookup.pointer(pointer) {
				let rewritten = self.rewrite_bare(id);
				if let Some(slot) = out.pointer_mut(&format!("/lookup{}", pointer)) {
					*slot = Value::String(rewritten);
				}
			}
		}

		for key in ["comparisonColumn", "displayColumn", "displayRow"] {
			let Some(original) = lookup.get(key) else { continue };
			let renamed = match original {
				Value::String(name) => Value::String(self.policy.column_name(name)),
				Value::Array(names) => Value::Array(
					names
						.iter()
						.map(|n| match n {
							Value::String(name) => Value::String(self.policy.column_name(name)),
							other => other.clone(),
						})
						.collect(),
				),
				other => other.clone(),
			};
			if let Some(slot) = out.pointer_mut(&format!("/lookup/{}", key)) {
				*slot = renamed;
			}
		}
		out
	}

	/// Variable source: `node-formula:<id>`, `condition:<id>`, `@table.<id>` or a node id
	pub fn rewrite_source_ref(&mut self, source_ref: &str) -> String {
		if source_ref.starts_with(SHARED_REF_PREFIX) {
			return source_ref.to_string();
		}
		self.rewrite_bare(source_ref)
	}

	pub fn into_external(self) -> BTreeSet<(RefKind, String)> {
		self.external
	}
}

fn is_json_text(text: &str) -> bool {
	let text = text.trim();
	(text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'))
}

/// Node ids referenced from a rewritten expression, in first-seen order
pub fn referenced_node_ids(value: &Value) -> Vec<String> {
	let mut refs = Vec::new();
	collect_references(value, false, &mut refs);
	let mut seen = BTreeSet::new();
	refs.into_iter()
		.filter(|r| matches!(r.kind, RefKind::Node | RefKind::SharedRef))
		.filter_map(|r| seen.insert(r.id.clone()).then_some(r.id))
		.collect()
}

fn collect_references(value: &Value, bare: bool, out: &mut Vec<Reference>) {
	match value {
		Value::String(s) if bare => out.extend(Reference::parse_bare(s)),
		Value::String(s) => out.extend(Reference::find_all(s)),
		Value::Array(items) => items.iter().for_each(|v| collect_references(v, bare, out)),
		Value::Object(map) => {
			for (k, v) in map {
				collect_references(v, BARE_KEYS.contains(&k.as_str()), out);
			}
		}
		_ => {}
	}
}


// vim: ts=4
