//! External parent resolution
//!
//! A copied node whose parent lies outside the copied subtree either reuses
//! a copy of that parent made by an earlier run, gets a cloned ancestor
//! chain, or stays attached to the original parent.

use std::collections::HashSet;

use crate::context::{DuplicationRun, NodePair};
use crate::node_clone::build_copy;
use crate::service::Engine;
use treebranch_types::prelude::*;

pub(crate) async fn resolve_external_parent(
	engine: &Engine,
	run: &mut DuplicationRun,
	parent_id: Option<&str>,
) -> TbResult<Option<String>> {
	let Some(parent_id) = parent_id else {
		return Ok(None);
	};
	if let Some(resolved) = run.parent_memo.get(parent_id) {
		return Ok(resolved.clone());
	}

	// A parent inside the subtree only happens with cyclic parent links
	if run.subtree.contains(parent_id) {
		return Ok(Some(parent_id.to_string()));
	}

	let existing_copy = run.policy.derive(parent_id);
	if existing_copy != parent_id && run.node_exists(&existing_copy) {
		debug!(parent_id = %parent_id, copy_id = %existing_copy, "reusing existing parent copy");
		run.parent_memo.insert(parent_id.to_string(), Some(existing_copy.clone()));
		return Ok(Some(existing_copy));
	}

	let clonable = run.opts.clone_external_parents
		&& run.sources.get(parent_id).is_some_and(|p| !engine.config.is_exempt_parent(&p.node_type));
	if !clonable {
		run.parent_memo.insert(parent_id.to_string(), Some(parent_id.to_string()));
		return Ok(Some(parent_id.to_string()));
	}

	clone_ancestor_chain(engine, run, parent_id).await
}

/// Clones `start` and its ancestors up to the tree root or the first
/// ancestor that is already resolved, exempt, or unknown
///
/// The chain is collected bottom-up with a worklist and created top-down.
/// Returns the copy of `start`.
async fn clone_ancestor_chain(
	engine: &Engine,
	run: &mut DuplicationRun,
	start: &str,
) -> TbResult<Option<String>> {
	let mut chain: Vec<String> = Vec::new();
	let mut seen = HashSet::new();
	let mut anchor: Option<String> = None;
	let mut cursor = Some(start.to_string());

	while let Some(id) = cursor.take() {
		if !seen.insert(id.clone()) {
			warn!(node_id = %id, "cycle in ancestor chain");
			anchor = Some(id);
			break;
		}
		if let Some(resolved) = run.parent_memo.get(&id) {
			anchor = resolved.clone();
			break;
		}
		if run.subtree.contains(&id) {
			anchor = Some(id);
			break;
		}
		let Some(node) = run.sources.get(&id) else {
			anchor = Some(id);
			break;
		};
		let copy_id = run.policy.derive(&id);
		if run.node_exists(&copy_id) {
			run.parent_memo.insert(id, Some(copy_id.clone()));
			anchor = Some(copy_id);
			break;
		}
		if engine.config.is_exempt_parent(&node.node_type) {
			anchor = Some(id);
			break;
		}
		cursor = node.parent_id.clone();
		chain.push(id);
	}

	let mut parent = anchor;
	for id in chain.iter().rev() {
		let Some(source) = run.sources.get(id).cloned() else { continue };
		let copy_id = run.policy.derive(id);
		run.capacities.insert(id.clone(), source.capacities());
		let copy = build_copy(run, &source, &copy_id, parent.clone());
		engine.store.create_node(&copy).await?;
		info!(ancestor_id = %id, copy_id = %copy_id, "external parent cloned");

		run.existing_ids.insert(copy_id.clone());
		run.maps.nodes.insert(id.clone(), copy_id.clone());
		run.parent_memo.insert(id.clone(), Some(copy_id.clone()));
		run.created.push(NodePair { source_id: id.clone(), copy_id: copy_id.clone() });
		parent = Some(copy_id);
	}
	Ok(parent)
}

// vim: ts=4
