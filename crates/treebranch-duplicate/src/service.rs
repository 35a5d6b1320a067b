//! Duplication entry point

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::Instrument;

use crate::capacity::{duplicate_capacities, duplicate_configs};
use crate::collect::{child_adjacency, collect_subtree};
use crate::context::{DuplicateResult, DuplicationRun};
use crate::events::TracingEventSink;
use crate::node_clone::copy_node;
use crate::options::{DuplicateOptions, DuplicatorConfig};
use crate::plan::plan_creation;
use crate::suffix::{SuffixPolicy, next_generation};
use crate::sync::{synchronize, verify_external_references};
use treebranch_types::event_sink::CapacityEventSink;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::{ListNodeOptions, TreeStoreAdapter};
use treebranch_types::tree::Node;

/// Adapters and settings shared by duplication requests
#[derive(Debug, Clone)]
pub struct Engine {
	pub store: Arc<dyn TreeStoreAdapter>,
	pub events: Arc<dyn CapacityEventSink>,
	pub config: DuplicatorConfig,
}

impl Engine {
	pub fn new(store: Arc<dyn TreeStoreAdapter>) -> Self {
		Self { store, events: Arc::new(TracingEventSink), config: DuplicatorConfig::default() }
	}

	pub fn with_event_sink(mut self, events: Arc<dyn CapacityEventSink>) -> Self {
		self.events = events;
		self
	}

	pub fn with_config(mut self, config: DuplicatorConfig) -> Self {
		self.config = config;
		self
	}
}

/// Duplicates the subtree rooted at `node_id`
///
/// # Errors
/// - `NotFound` if the node or its tree does not exist
/// - `Unauthorized` if the caller may not access the tree, before any write
/// - `ValidationError` for an invalid suffix or colliding copy ids
/// - `OwnerResolution` if a copied table cannot be given an owner
///
/// Failures of single capacities do not fail the call, they are listed in
/// [`DuplicateResult::skipped`].
pub async fn duplicate_subtree(
	engine: &Engine,
	auth: &AuthCtx,
	node_id: &str,
	opts: &DuplicateOptions,
) -> TbResult<DuplicateResult> {
	let span = info_span!("duplicate_subtree", node_id = %node_id);
	run_duplication(engine, auth, node_id, opts).instrument(span).await
}

async fn run_duplication(
	engine: &Engine,
	auth: &AuthCtx,
	node_id: &str,
	opts: &DuplicateOptions,
) -> TbResult<DuplicateResult> {
	let root = engine.store.read_node(node_id).await?.ok_or(Error::NotFound)?;
	let tree = engine.store.read_tree(&root.tree_id).await?.ok_or(Error::NotFound)?;
	if !auth.can_access(tree.organization_id.as_deref()) {
		warn!(tree_id = %tree.id, org = ?auth.organization_id, "duplication denied");
		return Err(Error::Unauthorized);
	}

	let nodes = engine.store.list_nodes(&ListNodeOptions::tree(&tree.id)).await?;
	let token = match &opts.suffix {
		Some(token) => token.clone(),
		None => next_generation(&root.id, nodes.iter().map(|n| n.id.as_str()), engine.config.max_suffix_digits)
			.to_string(),
	};
	let policy = SuffixPolicy::new(token, engine.config.max_suffix_digits)?;

	let subtree = collect_subtree(&root.id, &child_adjacency(&nodes));
	let sources: HashMap<String, Node> = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
	let plan = plan_creation(&subtree, &sources);
	if plan.fallback {
		warn!(root = %root.id, "parent links inside the subtree are cyclic, using depth order");
	}
	info!(root = %root.id, nodes = subtree.len(), suffix = %policy.token(), "duplicating subtree");

	let mut run = DuplicationRun::new(tree.id, policy, opts.clone(), subtree, sources);
	plan_node_ids(&mut run)?;

	for id in &plan.order {
		copy_node(engine, &mut run, id).await?;
	}
	// Ancestor clones are appended while copying, capacities follow creation order
	let mut index = 0;
	while let Some(pair) = run.created.get(index).cloned() {
		duplicate_capacities(engine, &mut run, &pair).await?;
		index += 1;
	}
	// Configs point at tables, which may be copied by a later sibling
	for pair in run.created.clone() {
		duplicate_configs(engine, &mut run, &pair).await;
	}

	synchronize(engine, &mut run).await;
	verify_external_references(engine, &mut run).await;

	let root_id = run
		.maps
		.nodes
		.get(&root.id)
		.cloned()
		.ok_or_else(|| Error::Internal(format!("root {} was not copied", root.id)))?;
	let result = run.into_result(&root.id, root_id);
	info!(
		root = %result.root_id,
		nodes = result.node_id_map.len(),
		skipped = result.skipped.len(),
		dangling = result.dangling_references.len(),
		"subtree duplicated"
	);
	Ok(result)
}

/// Precomputes the copy id of every subtree node
fn plan_node_ids(run: &mut DuplicationRun) -> TbResult<()> {
	let ids = run.subtree.ids().to_vec();
	let mut taken = HashSet::with_capacity(ids.len());
	for id in ids {
		let copy_id = run.policy.derive(&id);
		if copy_id == id {
			return Err(Error::ValidationError(format!(
				"node {} already carries suffix {}",
				id,
				run.policy.token()
			)));
		}
		if run.subtree.contains(&copy_id) {
			return Err(Error::ValidationError(format!("copy id {} is a node of the subtree", copy_id)));
		}
		if !taken.insert(copy_id.clone()) {
			return Err(Error::ValidationError(format!("copy id {} derived twice", copy_id)));
		}
		run.maps.nodes.insert(id, copy_id);
	}
	Ok(())
}

// vim: ts=4
