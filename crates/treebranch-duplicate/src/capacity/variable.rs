//! Variable duplication
//!
//! Variables owned by the node are copied onto its copy. A variable the
//! node only links to, owned by a node outside the subtree, gets a display
//! node under the copy. The display node is named after the owner and hosts
//! the variable copy along with copies of the owner's capacities. A hidden
//! placeholder already standing in for that owner is turned into the
//! display node.

use serde_json::{Map, Value, json};

use super::{condition, formula, table};
use crate::context::DuplicationRun;
use crate::reference::{SHARED_REF_PREFIX, referenced_node_ids};
use super::table::PLACEHOLDER_KEY;
use crate::service::Engine;
use treebranch_types::capacity::CapacityKind;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::{ListVariableOptions, UpdateNodeData};
use treebranch_types::tree::{DataBlock, Node, Variable};

pub(crate) async fn duplicate_variables(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
) -> TbResult<()> {
	let opts = ListVariableOptions { node_ids: Some(vec![source.id.clone()]), ..ListVariableOptions::default() };
	match engine.store.list_variables(&opts).await {
		Ok(variables) => {
			for variable in &variables {
				if let Err(err) = copy_owned_variable(engine, run, variable, copy_id).await {
					run.skip(&source.id, Some(CapacityKind::Variable), Some(&variable.id), &err);
				}
			}
		}
		Err(err) => run.skip(&source.id, Some(CapacityKind::Variable), None, &err),
	}

	for variable_id in &source.linked_variable_ids {
		if variable_id.starts_with(SHARED_REF_PREFIX) || run.maps.variables.contains_key(variable_id) {
			continue;
		}
		match copy_linked_variable(engine, run, source, copy_id, variable_id).await {
			Ok(()) => {}
			Err(err @ Error::OwnerResolution(_)) => return Err(err),
			Err(err) => run.skip(&source.id, Some(CapacityKind::Variable), Some(variable_id), &err),
		}
	}
	Ok(())
}

/// Copy of `variable` owned by `owner_id`, with a remapped source reference
fn variable_copy(run: &mut DuplicationRun, variable: &Variable, owner_id: &str) -> Variable {
	let source_ref = variable.source_ref.as_deref().map(|s| run.rewrite(|rw| rw.rewrite_source_ref(s)));
	let selected_node_id =
		variable.selected_node_id.as_ref().map(|id| run.maps.nodes.get(id).unwrap_or(id).clone());
	let metadata = run.rewrite(|rw| match rw.rewrite_value(&Value::Object(variable.metadata.clone())) {
		Value::Object(map) => map,
		_ => Map::new(),
	});

	Variable {
		id: run.policy.derive(&variable.id),
		node_id: owner_id.to_string(),
		exposed_key: run.policy.derive(&variable.exposed_key),
		display_name: run.policy.suffix(&variable.display_name),
		source_ref,
		selected_node_id,
		metadata,
		..variable.clone()
	}
}

/// Creates the copy unless an earlier run did, returns its id
async fn create_variable(
	engine: &Engine,
	run: &mut DuplicationRun,
	variable: &Variable,
	owner_id: &str,
) -> TbResult<String> {
	let new_id = run.policy.derive(&variable.id);
	if engine.store.read_variable(&new_id).await?.is_some() {
		debug!(variable_id = %variable.id, copy_id = %new_id, "variable copy exists");
		return Ok(new_id);
	}

	let copy = variable_copy(run, variable, owner_id);
	engine.store.create_variable(&copy).await?;
	let referenced = copy.source_ref.as_ref().map_or_else(Vec::new, |s| referenced_node_ids(&json!({ "ref": s })));
	run.emit(engine.events.as_ref(), owner_id, &new_id, CapacityKind::Variable, referenced);
	Ok(new_id)
}

async fn copy_owned_variable(
	engine: &Engine,
	run: &mut DuplicationRun,
	variable: &Variable,
	copy_id: &str,
) -> TbResult<()> {
	if run.maps.variables.contains_key(&variable.id) {
		return Ok(());
	}
	let new_id = create_variable(engine, run, variable, copy_id).await?;
	run.maps.variables.insert(variable.id.clone(), new_id.clone());
	run.owned_mut(copy_id).variables.push(new_id);
	Ok(())
}

async fn copy_linked_variable(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	variable_id: &str,
) -> TbResult<()> {
	if run.variable_copies.contains_key(variable_id) {
		return Ok(());
	}
	let Some(variable) = engine.store.read_variable(variable_id).await? else {
		debug!(node_id = %source.id, variable_id = %variable_id, "linked variable not found");
		return Ok(());
	};
	// Owned by a subtree node: its own pass copies it, the link is remapped afterwards
	if variable.node_id == source.id || run.subtree.contains(&variable.node_id) {
		return Ok(());
	}

	let owner = match run.sources.get(&variable.node_id).cloned() {
		Some(owner) => owner,
		None => engine.store.read_node(&variable.node_id).await?.ok_or(Error::NotFound)?,
	};
	let display_id = run.policy.derive(&owner.id);
	if run.subtree.contains(&display_id)
		|| run.maps.nodes.iter().any(|(original, copy)| *copy == display_id && *original != owner.id)
	{
		return Err(Error::ValidationError(format!("display node id {} is taken", display_id)));
	}

	let new_variable_id = run.policy.derive(&variable.id);
	let node = display_node(engine, run, &owner, &variable, copy_id, &display_id, &new_variable_id);
	if run.node_exists(&display_id) {
		promote_placeholder(engine, run, &node).await?;
	} else {
		engine.store.create_node(&node).await?;
		run.existing_ids.insert(display_id.clone());
		info!(variable_id = %variable.id, display_id = %display_id, "display node created");
	}

	formula::duplicate_formulas(engine, run, &owner, &display_id).await;
	condition::duplicate_conditions(engine, run, &owner, &display_id).await;
	table::duplicate_tables(engine, run, &owner, &display_id).await?;
	let new_id = create_variable(engine, run, &variable, &display_id).await?;

	let owned = run.owned.get(&display_id).cloned().unwrap_or_default();
	let update = UpdateNodeData {
		linked_formula_ids: Patch::Value(owned.formulas),
		linked_condition_ids: Patch::Value(owned.conditions),
		linked_table_ids: Patch::Value(owned.tables),
		..UpdateNodeData::default()
	};
	engine.store.update_node(&display_id, &update).await?;

	run.variable_copies.insert(variable.id.clone(), new_id.clone());
	run.maps.variables.insert(variable.id.clone(), new_id);
	if !run.display_node_ids.contains(&display_id) {
		run.display_node_ids.push(display_id);
	}
	Ok(())
}

/// Turns a placeholder owner into the display node, leaves any other node as is
async fn promote_placeholder(engine: &Engine, run: &mut DuplicationRun, shown: &Node) -> TbResult<()> {
	let from_run = run.placeholder_ids.contains(&shown.id);
	if !from_run {
		let existing = engine.store.read_node(&shown.id).await?;
		if !existing.is_some_and(|n| n.metadata.contains_key(PLACEHOLDER_KEY)) {
			debug!(display_id = %shown.id, "display node exists, reusing it");
			return Ok(());
		}
	}

	let update = UpdateNodeData {
		parent_id: Patch::from(shown.parent_id.clone()),
		node_type: Patch::Value(shown.node_type.clone()),
		field_type: Patch::from(shown.field_type.clone()),
		is_visible: Patch::Value(true),
		is_active: Patch::Value(true),
		has_formula: Patch::Value(shown.has_formula),
		has_condition: Patch::Value(shown.has_condition),
		has_table: Patch::Value(true),
		has_data: Patch::Value(true),
		data_active_id: Patch::from(shown.data_active_id.clone()),
		linked_variable_ids: Patch::Value(shown.linked_variable_ids.clone()),
		data: Patch::from(shown.data.clone()),
		metadata: Patch::Value(shown.metadata.clone()),
		..UpdateNodeData::default()
	};
	engine.store.update_node(&shown.id, &update).await?;
	run.placeholder_ids.retain(|id| *id != shown.id);
	info!(display_id = %shown.id, "placeholder promoted to display node");
	Ok(())
}

fn display_node(
	engine: &Engine,
	run: &DuplicationRun,
	owner: &Node,
	variable: &Variable,
	parent_id: &str,
	display_id: &str,
	variable_copy_id: &str,
) -> Node {
	let mut metadata = Map::new();
	metadata.insert("fromVariableId".into(), Value::String(variable.id.clone()));
	metadata.insert("autoCreatedDisplayNode".into(), Value::Bool(true));
	metadata.insert("copiedFromNodeId".into(), Value::String(owner.id.clone()));
	metadata.insert("copySuffix".into(), Value::String(run.policy.token().to_string()));
	if run.opts.is_repeat_instance {
		metadata.insert("duplicatedFromRepeater".into(), Value::Bool(true));
	}

	Node {
		id: display_id.to_string(),
		tree_id: run.tree_id.clone(),
		parent_id: Some(parent_id.to_string()),
		node_type: engine.config.display_node_type.clone(),
		field_type: owner.field_type.clone(),
		label: run.policy.suffix(&owner.label),
		order: owner.order,
		is_visible: true,
		is_active: true,
		has_formula: owner.has_formula,
		has_condition: owner.has_condition,
		has_table: owner.has_table,
		has_data: true,
		data_active_id: Some(variable_copy_id.to_string()),
		linked_variable_ids: vec![variable_copy_id.to_string()],
		data: Some(DataBlock {
			exposed_key: Some(run.policy.derive(&variable.exposed_key)),
			display_format: variable.display_format.clone(),
			unit: variable.unit.clone(),
			precision: variable.precision,
			visible_to_user: variable.visible_to_user,
		}),
		metadata,
		..Node::default()
	}
}

// vim: ts=4
