//! Node cloning

use serde_json::{Map, Value};

use crate::context::{DuplicationRun, NodePair};
use crate::parent::resolve_external_parent;
use crate::reference::{RefKind, Rewriter};
use crate::service::Engine;
use treebranch_types::prelude::*;
use treebranch_types::tree::{AiAssistBlock, LinkBlock, Node, RepeaterBlock, SelectBlock, TableInstanceBlock};

/// Builds the copy of `source` without persisting it
///
/// Configuration blocks go through the reference walker. Values computed
/// from a formula, condition or table are cleared so they get recomputed.
pub(crate) fn build_copy(
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	parent_id: Option<String>,
) -> Node {
	let capacities = run.capacities_of(&source.id);
	let strip_repeater = run.opts.repeat_context.is_some();

	let mut copy = source.clone();
	copy.id = copy_id.to_string();
	copy.parent_id = parent_id;
	copy.label = run.policy.suffix(&source.label);

	if capacities.is_computed() {
		copy.calculated_value = None;
	}

	if !run.opts.preserve_shared_references {
		copy.is_shared_reference = false;
		copy.shared_reference_id = None;
		copy.shared_reference_ids = Vec::new();
		copy.shared_reference_name = None;
	}

	run.rewrite(|rw| {
		copy.select = source.select.as_ref().map(|block| rewrite_select(rw, block));
		copy.link = source.link.as_ref().map(|block| rewrite_link(rw, block));
		copy.table = source.table.as_ref().map(|block| TableInstanceBlock {
			instances: block.instances.as_ref().map(|i| rewrite_table_instances(rw, i)),
			..block.clone()
		});
		copy.repeater = if strip_repeater {
			None
		} else {
			source.repeater.as_ref().map(|block| rewrite_repeater(rw, block))
		};
		copy.ai = source.ai.as_ref().map(|block| AiAssistBlock {
			prompt: block.prompt.as_deref().map(|p| rw.rewrite_str(p)),
			..block.clone()
		});
		copy.metadata = rewrite_metadata(rw, &source.metadata);
	});

	copy.metadata.insert("copiedFromNodeId".into(), Value::String(source.id.clone()));
	copy.metadata.insert("copySuffix".into(), Value::String(run.policy.token().to_string()));
	copy
}

fn rewrite_select(rw: &mut Rewriter, block: &SelectBlock) -> SelectBlock {
	SelectBlock {
		source: block.source.as_deref().map(|s| rw.rewrite_str(s)),
		options: block.options.as_ref().map(|o| rw.rewrite_value(o)),
		..block.clone()
	}
}

fn rewrite_link(rw: &mut Rewriter, block: &LinkBlock) -> LinkBlock {
	LinkBlock {
		target_node_id: block.target_node_id.as_deref().map(|id| rw.map_or_keep(RefKind::Node, id)),
		params: block.params.as_ref().map(|p| rw.rewrite_value(p)),
		..block.clone()
	}
}

fn rewrite_repeater(rw: &mut Rewriter, block: &RepeaterBlock) -> RepeaterBlock {
	RepeaterBlock {
		template_node_ids: block
			.template_node_ids
			.iter()
			.map(|id| rw.map_or_keep(RefKind::Node, id))
			.collect(),
		..block.clone()
	}
}

/// Instances are keyed by table id and carry a `tableId` of their own
fn rewrite_table_instances(rw: &mut Rewriter, instances: &Value) -> Value {
	let Value::Object(map) = instances else {
		return rw.rewrite_value(instances);
	};
	let mut out = Map::with_capacity(map.len());
	for (table_id, instance) in map {
		let mut instance = rw.rewrite_value(instance);
		if let Some(slot) = instance.get_mut("tableId") {
			if let Value::String(id) = slot {
				let mapped = rw.resolve(RefKind::Table, id);
				*slot = Value::String(mapped);
			}
		}
		out.insert(rw.resolve(RefKind::Table, table_id), instance);
	}
	Value::Object(out)
}

fn rewrite_metadata(rw: &mut Rewriter, metadata: &Map<String, Value>) -> Map<String, Value> {
	metadata
		.iter()
		.filter(|(k, _)| *k != "copiedFromNodeId" && *k != "copySuffix")
		.map(|(k, v)| (k.clone(), rw.rewrite_value(v)))
		.collect()
}

/// Creates the copy of one planned node
///
/// The root copy goes under the requested target parent, or under its
/// resolved external parent. Every other node goes under its parent's copy.
/// A copy that already exists is reused.
pub(crate) async fn copy_node(engine: &Engine, run: &mut DuplicationRun, source_id: &str) -> TbResult<()> {
	let source = run.sources.get(source_id).cloned().ok_or(Error::NotFound)?;
	let copy_id = run
		.maps
		.nodes
		.get(source_id)
		.cloned()
		.ok_or_else(|| Error::Internal(format!("no copy id planned for {}", source_id)))?;

	let parent_id = if source_id == run.subtree.root_id() {
		match run.opts.target_parent_id.clone() {
			Some(target) => Some(target),
			None => resolve_external_parent(engine, run, source.parent_id.as_deref()).await?,
		}
	} else {
		match source.parent_id.as_deref() {
			Some(parent) if run.subtree.contains(parent) => run.maps.nodes.get(parent).cloned(),
			other => resolve_external_parent(engine, run, other).await?,
		}
	};

	if run.node_exists(&copy_id) {
		debug!(node_id = %source_id, copy_id = %copy_id, "copy already exists, reusing it");
	} else {
		let copy = build_copy(run, &source, &copy_id, parent_id);
		engine.store.create_node(&copy).await?;
		run.existing_ids.insert(copy_id.clone());
	}

	run.created.push(NodePair { source_id: source_id.to_string(), copy_id });
	Ok(())
}


// vim: ts=4
