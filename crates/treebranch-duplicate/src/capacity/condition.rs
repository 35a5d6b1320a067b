//! Condition duplication

use super::set_active_pointer;
use crate::context::DuplicationRun;
use crate::reference::referenced_node_ids;
use crate::service::Engine;
use treebranch_types::capacity::{Capacity, CapacityKind};
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;
use treebranch_types::tree::{Condition, Node};

pub(crate) async fn duplicate_conditions(engine: &Engine, run: &mut DuplicationRun, source: &Node, copy_id: &str) {
	let conditions = match engine.store.list_conditions(&source.id).await {
		Ok(conditions) => conditions,
		Err(err) => {
			run.skip(&source.id, Some(CapacityKind::Condition), None, &err);
			return;
		}
	};

	for condition in &conditions {
		if let Err(err) = duplicate_condition(engine, run, source, copy_id, condition).await {
			run.skip(&source.id, Some(CapacityKind::Condition), Some(&condition.id), &err);
		}
	}
}

async fn duplicate_condition(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	condition: &Condition,
) -> TbResult<()> {
	if run.maps.conditions.contains_key(&condition.id) {
		return Ok(());
	}
	let new_id = run.policy.derive(&condition.id);

	if engine.store.read_condition(&new_id).await?.is_some() {
		debug!(condition_id = %condition.id, copy_id = %new_id, "condition copy exists");
	} else {
		let condition_set = run.rewrite(|rw| rw.rewrite_condition_set(&condition.condition_set));
		let referenced = referenced_node_ids(&condition_set);
		let copy = Condition {
			id: new_id.clone(),
			node_id: copy_id.to_string(),
			name: run.policy.suffix(&condition.name),
			condition_set,
			..condition.clone()
		};
		engine.store.create_condition(&copy).await?;
		run.emit(engine.events.as_ref(), copy_id, &new_id, CapacityKind::Condition, referenced);
	}

	run.maps.conditions.insert(condition.id.clone(), new_id.clone());
	run.owned_mut(copy_id).conditions.push(new_id.clone());

	let enabled = run.capacities_of(&source.id).contains(Capacity::Condition);
	if enabled && source.condition_active_id.as_deref() == Some(condition.id.as_str()) {
		let update =
			UpdateNodeData { condition_active_id: Patch::Value(new_id), ..UpdateNodeData::default() };
		set_active_pointer(engine, copy_id, update).await?;
	}
	Ok(())
}

// vim: ts=4
