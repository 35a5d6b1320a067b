//! Formula duplication

use serde_json::Value;

use super::set_active_pointer;
use crate::context::DuplicationRun;
use crate::reference::referenced_node_ids;
use crate::service::Engine;
use treebranch_types::capacity::{Capacity, CapacityKind};
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;
use treebranch_types::tree::{Formula, Node};

pub(crate) async fn duplicate_formulas(engine: &Engine, run: &mut DuplicationRun, source: &Node, copy_id: &str) {
	let formulas = match engine.store.list_formulas(&source.id).await {
		Ok(formulas) => formulas,
		Err(err) => {
			run.skip(&source.id, Some(CapacityKind::Formula), None, &err);
			return;
		}
	};

	for formula in &formulas {
		if let Err(err) = duplicate_formula(engine, run, source, copy_id, formula).await {
			run.skip(&source.id, Some(CapacityKind::Formula), Some(&formula.id), &err);
		}
	}
}

async fn duplicate_formula(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	formula: &Formula,
) -> TbResult<()> {
	if run.maps.formulas.contains_key(&formula.id) {
		return Ok(());
	}
	let new_id = run.policy.derive(&formula.id);

	if engine.store.read_formula(&new_id).await?.is_some() {
		debug!(formula_id = %formula.id, copy_id = %new_id, "formula copy exists");
	} else {
		let tokens = run.rewrite(|rw| rw.rewrite_tokens(&formula.tokens));
		let copy = Formula {
			id: new_id.clone(),
			node_id: copy_id.to_string(),
			name: run.policy.suffix(&formula.name),
			tokens,
			..formula.clone()
		};
		engine.store.create_formula(&copy).await?;
		run.emit(
			engine.events.as_ref(),
			copy_id,
			&new_id,
			CapacityKind::Formula,
			referenced_node_ids(&Value::Array(copy.tokens)),
		);
	}

	run.maps.formulas.insert(formula.id.clone(), new_id.clone());
	run.owned_mut(copy_id).formulas.push(new_id.clone());

	let enabled = run.capacities_of(&source.id).contains(Capacity::Formula);
	if enabled && source.formula_active_id.as_deref() == Some(formula.id.as_str()) {
		let update = UpdateNodeData { formula_active_id: Patch::Value(new_id), ..UpdateNodeData::default() };
		set_active_pointer(engine, copy_id, update).await?;
	}
	Ok(())
}

// vim: ts=4
