//! Post-copy synchronization
//!
//! Runs once every copy and its capacities exist. Linked id lists and active
//! pointers copied verbatim from the source are remapped to the copies, and
//! each copy that owns a variable gets its data pointer.

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::context::{DanglingReference, DuplicationRun, NodePair};
use crate::reference::RefKind;
use crate::service::Engine;
use treebranch_types::capacity::Capacity;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;
use treebranch_types::tree::DataBlock;

/// Linked ids in source order, mapped when copied, then the copies not linked yet
fn remap_linked(source_ids: &[String], map: &BTreeMap<String, String>, owned: &[String]) -> Vec<String> {
	source_ids
		.iter()
		.map(|id| map.get(id).unwrap_or(id))
		.chain(owned.iter())
		.unique()
		.cloned()
		.collect()
}

/// Mapped active pointer, only for a node that has the capacity
fn remap_active(
	active: Option<&String>,
	enabled: bool,
	map: &BTreeMap<String, String>,
	current: Option<&String>,
) -> Patch<String> {
	match active.and_then(|id| map.get(id)) {
		Some(mapped) if enabled && current != Some(mapped) => Patch::Value(mapped.clone()),
		_ => Patch::Undefined,
	}
}

pub(crate) async fn synchronize(engine: &Engine, run: &mut DuplicationRun) {
	let pairs = run.created.clone();
	for pair in &pairs {
		if let Err(err) = synchronize_node(engine, run, pair).await {
			run.skip(&pair.copy_id, None, None, &err);
		}
	}
}

async fn synchronize_node(engine: &Engine, run: &DuplicationRun, pair: &NodePair) -> TbResult<()> {
	let Some(source) = run.sources.get(&pair.source_id) else {
		return Ok(());
	};
	let copy = engine.store.read_node(&pair.copy_id).await?.ok_or(Error::NotFound)?;
	let owned = run.owned.get(&pair.copy_id).cloned().unwrap_or_default();
	let capacities = run.capacities_of(&source.id);
	let maps = &run.maps;

	let mut update = UpdateNodeData::default();
	let linked = [
		(&source.linked_formula_ids, &maps.formulas, &owned.formulas, &copy.linked_formula_ids),
		(&source.linked_condition_ids, &maps.conditions, &owned.conditions, &copy.linked_condition_ids),
		(&source.linked_table_ids, &maps.tables, &owned.tables, &copy.linked_table_ids),
		(&source.linked_variable_ids, &maps.variables, &owned.variables, &copy.linked_variable_ids),
	]
	.map(|(ids, map, owned, current)| {
		let remapped = remap_linked(ids, map, owned);
		if remapped == *current { Patch::Undefined } else { Patch::Value(remapped) }
	});
	let [formulas, conditions, tables, variables] = linked;
	update.linked_formula_ids = formulas;
	update.linked_condition_ids = conditions;
	update.linked_table_ids = tables;
	update.linked_variable_ids = variables;

	update.formula_active_id = remap_active(
		source.formula_active_id.as_ref(),
		capacities.contains(Capacity::Formula),
		&maps.formulas,
		copy.formula_active_id.as_ref(),
	);
	update.condition_active_id = remap_active(
		source.condition_active_id.as_ref(),
		capacities.contains(Capacity::Condition),
		&maps.conditions,
		copy.condition_active_id.as_ref(),
	);
	update.table_active_id = remap_active(
		source.table_active_id.as_ref(),
		capacities.contains(Capacity::Table),
		&maps.tables,
		copy.table_active_id.as_ref(),
	);

	let data_pointer = match source.data_active_id.as_ref().and_then(|id| maps.variables.get(id)) {
		Some(mapped) => Some(mapped.clone()),
		None if copy.data_active_id.is_none() || copy.data_active_id == source.data_active_id => {
			owned.variables.first().cloned()
		}
		None => None,
	};
	if let Some(variable_id) = data_pointer.filter(|id| copy.data_active_id.as_ref() != Some(id)) {
		if let Some(variable) = engine.store.read_variable(&variable_id).await? {
			update.data = Patch::Value(DataBlock {
				exposed_key: Some(variable.exposed_key),
				display_format: variable.display_format,
				unit: variable.unit,
				precision: variable.precision,
				visible_to_user: variable.visible_to_user,
			});
		}
		update.data_active_id = Patch::Value(variable_id);
		if !copy.has_data {
			update.has_data = Patch::Value(true);
		}
	}

	if update.is_empty() {
		return Ok(());
	}
	debug!(copy_id = %pair.copy_id, "synchronizing copy");
	engine.store.update_node(&pair.copy_id, &update).await
}

/// Checks every reference derived for an id outside the run's maps
pub(crate) async fn verify_external_references(engine: &Engine, run: &mut DuplicationRun) {
	let external = std::mem::take(&mut run.external_refs);
	for (kind, id) in &external {
		let found = match kind {
			RefKind::Node | RefKind::SharedRef if run.node_exists(id) => Ok(true),
			RefKind::Node | RefKind::SharedRef => engine.store.read_node(id).await.map(|n| n.is_some()),
			RefKind::Formula => engine.store.read_formula(id).await.map(|f| f.is_some()),
			RefKind::Condition => engine.store.read_condition(id).await.map(|c| c.is_some()),
			RefKind::Table => engine.store.read_table(id).await.map(|t| t.is_some()),
		};
		match found {
			Ok(true) => {}
			Ok(false) => {
				warn!(kind = ?kind, id = %id, "dangling reference after duplication");
				run.dangling.push(DanglingReference { kind: *kind, id: id.clone() });
			}
			Err(err) => warn!(kind = ?kind, id = %id, error = %err, "could not verify reference"),
		}
	}
	run.external_refs = external;
}


// vim: ts=4
