//! State of one duplication run
//!
//! Everything a run accumulates (identifier maps, memo caches, skipped
//! capacities) lives here and is passed explicitly to every stage. Nothing
//! is shared between runs.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::collect::Subtree;
use crate::options::DuplicateOptions;
use crate::reference::{IdMaps, RefKind, Rewriter};
use crate::suffix::SuffixPolicy;
use treebranch_types::capacity::{CapacityKind, CapacitySet};
use treebranch_types::event_sink::{CapacityEvent, CapacityEventSink};
use treebranch_types::prelude::*;
use treebranch_types::tree::Node;

/// A source node and its copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePair {
	pub source_id: String,
	pub copy_id: String,
}

/// Capacity copies owned by one copied node, in creation order
#[derive(Debug, Clone, Default)]
pub struct OwnedCopies {
	pub formulas: Vec<String>,
	pub conditions: Vec<String>,
	pub tables: Vec<String>,
	pub variables: Vec<String>,
}

/// A capacity that could not be copied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCapacity {
	pub node_id: String,
	/// `None` when the node itself could not be synchronized
	pub kind: Option<CapacityKind>,
	pub capacity_id: Option<String>,
	pub reason: String,
}

/// A rewritten reference whose target does not exist after the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
	pub kind: RefKind,
	pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResult {
	pub source_root_id: String,
	pub root_id: String,
	pub suffix: String,
	pub node_id_map: BTreeMap<String, String>,
	pub formula_id_map: BTreeMap<String, String>,
	pub condition_id_map: BTreeMap<String, String>,
	pub table_id_map: BTreeMap<String, String>,
	pub variable_id_map: BTreeMap<String, String>,
	pub display_node_ids: Vec<String>,
	pub placeholder_node_ids: Vec<String>,
	/// False if any capacity was skipped
	pub complete: bool,
	pub skipped: Vec<SkippedCapacity>,
	pub dangling_references: Vec<DanglingReference>,
}

#[derive(Debug)]
pub struct DuplicationRun {
	pub tree_id: String,
	pub policy: SuffixPolicy,
	pub opts: DuplicateOptions,
	pub subtree: Subtree,
	/// Snapshot of every node of the tree, by id
	pub sources: HashMap<String, Node>,
	pub maps: IdMaps,
	/// Capacity set of each source node, computed once
	pub capacities: HashMap<String, CapacitySet>,
	/// Copied nodes in creation order, external ancestors included
	pub created: Vec<NodePair>,
	pub existing_ids: HashSet<String>,
	pub placeholder_ids: Vec<String>,
	/// External parent id to the parent its copies attach to
	pub parent_memo: HashMap<String, Option<String>>,
	/// Variable copies hosted by display nodes, by original variable id
	pub variable_copies: HashMap<String, String>,
	pub display_node_ids: Vec<String>,
	pub owned: HashMap<String, OwnedCopies>,
	/// Table copy id to the node owning it
	pub table_owners: HashMap<String, String>,
	pub skipped: Vec<SkippedCapacity>,
	pub external_refs: BTreeSet<(RefKind, String)>,
	pub dangling: Vec<DanglingReference>,
}

impl DuplicationRun {
	pub fn new(
		tree_id: impl Into<String>,
		policy: SuffixPolicy,
		opts: DuplicateOptions,
		subtree: Subtree,
		sources: HashMap<String, Node>,
	) -> Self {
		let existing_ids = sources.keys().cloned().collect();
		let capacities = subtree
			.ids()
			.iter()
			.filter_map(|id| sources.get(id).map(|n| (id.clone(), n.capacities())))
			.collect();
		Self {
			tree_id: tree_id.into(),
			policy,
			opts,
			subtree,
			sources,
			maps: IdMaps::default(),
			capacities,
			created: Vec::new(),
			existing_ids,
			placeholder_ids: Vec::new(),
			parent_memo: HashMap::new(),
			variable_copies: HashMap::new(),
			display_node_ids: Vec::new(),
			owned: HashMap::new(),
			table_owners: HashMap::new(),
			skipped: Vec::new(),
			external_refs: BTreeSet::new(),
			dangling: Vec::new(),
		}
	}

	/// Runs `f` with a rewriter over the current maps and keeps its external references
	pub fn rewrite<T>(&mut self, f: impl FnOnce(&mut Rewriter) -> T) -> T {
		let mut rewriter =
			Rewriter::new(&self.maps, &self.policy, self.opts.preserve_shared_references);
		let out = f(&mut rewriter);
		let external = rewriter.into_external();
		self.external_refs.extend(external);
		out
	}

	pub fn node_exists(&self, id: &str) -> bool {
		self.existing_ids.contains(id)
	}

	/// Capacity set of a source node
	pub fn capacities_of(&self, source_id: &str) -> CapacitySet {
		self.capacities
			.get(source_id)
			.copied()
			.or_else(|| self.sources.get(source_id).map(Node::capacities))
			.unwrap_or_default()
	}

	pub fn owned_mut(&mut self, copy_id: &str) -> &mut OwnedCopies {
		self.owned.entry(copy_id.to_string()).or_default()
	}

	pub fn skip(
		&mut self,
		node_id: &str,
		kind: Option<CapacityKind>,
		capacity_id: Option<&str>,
		err: &Error,
	) {
		warn!(
			node_id = %node_id,
			kind = ?kind,
			capacity_id = ?capacity_id,
			error = %err,
			"capacity duplication skipped"
		);
		self.skipped.push(SkippedCapacity {
			node_id: node_id.to_string(),
			kind,
			capacity_id: capacity_id.map(ToString::to_string),
			reason: err.to_string(),
		});
	}

	/// Reports a created copy to the event sink, only inside a repeat context
	pub fn emit(
		&self,
		sink: &dyn CapacityEventSink,
		owner_node_id: &str,
		capacity_id: &str,
		kind: CapacityKind,
		referenced_node_ids: Vec<String>,
	) {
		let Some(repeat_context) = &self.opts.repeat_context else {
			return;
		};
		sink.record(CapacityEvent {
			owner_node_id: owner_node_id.to_string(),
			capacity_id: capacity_id.to_string(),
			kind,
			referenced_node_ids,
			repeat_context: Some(repeat_context.clone()),
		});
	}

	pub fn into_result(self, source_root_id: &str, root_id: String) -> DuplicateResult {
		DuplicateResult {
			source_root_id: source_root_id.to_string(),
			root_id,
			suffix: self.policy.token().to_string(),
			node_id_map: self.maps.nodes,
			formula_id_map: self.maps.formulas,
			condition_id_map: self.maps.conditions,
			table_id_map: self.maps.tables,
			variable_id_map: self.maps.variables,
			display_node_ids: self.display_node_ids,
			placeholder_node_ids: self.placeholder_ids,
			complete: self.skipped.is_empty(),
			skipped: self.skipped,
			dangling_references: self.dangling,
		}
	}
}

// vim: ts=4
